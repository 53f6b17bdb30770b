//! Gesture queue and its mapping onto the camera and the brush.
//!
//! Window callbacks only push `GestureEvent`s; the queue is drained once per
//! frame before the simulation step, so camera and tool updates happen in
//! event order at a single point of the frame.

use crate::camera::CameraRig;
use glam::Vec2;
use std::collections::{BTreeMap, VecDeque};
use voxfield::Brush;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
};

/// Brush radius used until the user picks another one.
pub const DEFAULT_BRUSH_RADIUS: f32 = 0.1;

/// Camera distance per mouse wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Start,
    Move,
    End,
}

/// One pointer update. `x` and `y` are normalized to [-1,1], y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub pointer_count: u8,
    pub x: f32,
    pub y: f32,
    /// Zoom amount in world units, when the device reports one directly.
    pub pinch_delta: Option<f32>,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, pointer_count: u8, x: f32, y: f32) -> Self {
        Self {
            kind,
            pointer_count,
            x,
            y,
            pinch_delta: None,
        }
    }

    pub fn with_pinch(mut self, delta: f32) -> Self {
        self.pinch_delta = Some(delta);
        self
    }
}

#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<GestureEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: GestureEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GestureEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Brush as the user controls it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolState {
    /// Screen position in [0,1]², y up.
    pub plane: Vec2,
    pub radius: f32,
    /// A sculpt drag is in progress.
    pub active: bool,
    /// Single-pointer drags sculpt instead of rotating.
    pub sculpt_mode: bool,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            plane: Vec2::splat(0.5),
            radius: DEFAULT_BRUSH_RADIUS,
            active: false,
            sculpt_mode: false,
        }
    }
}

impl ToolState {
    pub fn brush(&self) -> Brush {
        Brush {
            plane: self.plane,
            radius: self.radius,
            active: self.active && self.sculpt_mode,
        }
    }

    fn aim(&mut self, pointer: Vec2) {
        self.plane = pointer * 0.5 + 0.5;
        self.active = true;
    }
}

/// Turns gestures into camera and tool changes.
#[derive(Debug)]
pub struct GestureMapper {
    last: Option<Vec2>,
    viewport: Vec2,
}

impl GestureMapper {
    pub fn new(width: u32, height: u32) -> Self {
        let mut mapper = Self {
            last: None,
            viewport: Vec2::ONE,
        };
        mapper.resize(width, height);
        mapper
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// Applies every queued event in order.
    ///
    /// One pointer rotates, or sculpts when sculpt mode is on; never both.
    /// Two pointers zoom and never sculpt.
    pub fn drain(&mut self, queue: &mut InputQueue, camera: &mut CameraRig, tool: &mut ToolState) {
        for event in queue.drain() {
            let pointer = Vec2::new(event.x, event.y);
            match event.kind {
                GestureKind::Start => {
                    self.last = Some(pointer);
                    if event.pointer_count == 1 && tool.sculpt_mode {
                        tool.aim(pointer);
                    } else {
                        tool.active = false;
                    }
                }
                GestureKind::Move => {
                    let last = self.last.replace(pointer).unwrap_or(pointer);
                    // Screen fraction, y down, as window pixels / window size.
                    let delta = (pointer - last) * Vec2::new(0.5, -0.5);

                    match event.pointer_count {
                        1 if tool.sculpt_mode => tool.aim(pointer),
                        1 => camera.rotate(delta.x, delta.y),
                        _ => {
                            tool.active = false;
                            let amount = event.pinch_delta.unwrap_or_else(|| {
                                let pixels = delta * self.viewport;
                                pixels.x + pixels.y
                            });
                            camera.zoom(amount);
                        }
                    }
                }
                GestureKind::End => {
                    self.last = None;
                    tool.active = false;
                }
            }
        }
    }
}

/// Events that finish a drag. These must reach the tracker even when the
/// overlay claims them, or a button released over a panel leaves the drag
/// running.
pub fn ends_gesture(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::MouseInput { state, .. } => *state == ElementState::Released,
        WindowEvent::Touch(touch) => {
            matches!(touch.phase, TouchPhase::Ended | TouchPhase::Cancelled)
        }
        WindowEvent::CursorLeft { .. } => true,
        _ => false,
    }
}

/// Converts winit mouse and touch events into gestures.
///
/// Left button drags are one pointer, right button drags two. The wheel is a
/// two-pointer pinch. Touches are tracked by id; the lowest id is the
/// reported position and two touches pinch by their change in distance.
#[derive(Debug)]
pub struct PointerTracker {
    size: PhysicalSize<u32>,
    cursor: PhysicalPosition<f64>,
    mouse_pointers: u8,
    touches: BTreeMap<u64, PhysicalPosition<f64>>,
    touch_distance: Option<f64>,
}

impl PointerTracker {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            cursor: PhysicalPosition::new(0.0, 0.0),
            mouse_pointers: 0,
            touches: BTreeMap::new(),
            touch_distance: None,
        }
    }

    fn normalize(&self, p: PhysicalPosition<f64>) -> (f32, f32) {
        let w = self.size.width.max(1) as f64;
        let h = self.size.height.max(1) as f64;
        ((p.x / w * 2.0 - 1.0) as f32, (1.0 - p.y / h * 2.0) as f32)
    }

    fn gesture(&self, kind: GestureKind, count: u8, at: PhysicalPosition<f64>) -> GestureEvent {
        let (x, y) = self.normalize(at);
        GestureEvent::new(kind, count, x, y)
    }

    pub fn handle_event(&mut self, event: &WindowEvent, queue: &mut InputQueue) {
        match event {
            WindowEvent::Resized(size) => self.size = *size,
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                if self.mouse_pointers > 0 {
                    queue.push(self.gesture(GestureKind::Move, self.mouse_pointers, self.cursor));
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let count = match button {
                    MouseButton::Left => 1,
                    MouseButton::Right => 2,
                    _ => return,
                };
                match state {
                    ElementState::Pressed if self.mouse_pointers == 0 => {
                        self.mouse_pointers = count;
                        queue.push(self.gesture(GestureKind::Start, count, self.cursor));
                    }
                    ElementState::Released if self.mouse_pointers == count => {
                        self.mouse_pointers = 0;
                        queue.push(self.gesture(GestureKind::End, count, self.cursor));
                    }
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                queue.push(
                    self.gesture(GestureKind::Move, 2, self.cursor)
                        .with_pinch(notches * WHEEL_ZOOM_STEP),
                );
            }
            WindowEvent::CursorLeft { .. } if self.mouse_pointers > 0 => {
                queue.push(self.gesture(GestureKind::End, self.mouse_pointers, self.cursor));
                self.mouse_pointers = 0;
            }
            WindowEvent::Touch(touch) => self.handle_touch(touch.id, touch.phase, touch.location, queue),
            _ => {}
        }
    }

    fn handle_touch(
        &mut self,
        id: u64,
        phase: TouchPhase,
        location: PhysicalPosition<f64>,
        queue: &mut InputQueue,
    ) {
        let before = self.touches.len();
        match phase {
            TouchPhase::Started | TouchPhase::Moved => {
                self.touches.insert(id, location);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&id);
            }
        }
        let count = self.touches.len();

        if count != before {
            self.touch_distance = self.pinch_distance();
            if before > 0 {
                queue.push(self.gesture(GestureKind::End, before.min(2) as u8, location));
            }
            if let Some(first) = self.first_touch() {
                queue.push(self.gesture(GestureKind::Start, count.min(2) as u8, first));
            }
            return;
        }

        let Some(first) = self.first_touch() else {
            return;
        };
        let mut event = self.gesture(GestureKind::Move, count.min(2) as u8, first);
        if let Some(distance) = self.pinch_distance() {
            let previous = self.touch_distance.replace(distance).unwrap_or(distance);
            event = event.with_pinch((distance - previous) as f32);
        }
        queue.push(event);
    }

    fn first_touch(&self) -> Option<PhysicalPosition<f64>> {
        self.touches.values().next().copied()
    }

    fn pinch_distance(&self) -> Option<f64> {
        let mut it = self.touches.values();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => Some(((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(queue: &mut InputQueue, pointers: u8, from: (f32, f32), to: (f32, f32)) {
        queue.push(GestureEvent::new(GestureKind::Start, pointers, from.0, from.1));
        queue.push(GestureEvent::new(GestureKind::Move, pointers, to.0, to.1));
    }

    #[test]
    fn single_pointer_rotates_without_sculpting() {
        let mut camera = CameraRig::new(800, 600);
        let mut tool = ToolState::default();
        let mut mapper = GestureMapper::new(800, 600);
        let mut queue = InputQueue::default();

        let before = camera.model_rotation();
        drag(&mut queue, 1, (0.0, 0.0), (0.1, 0.05));
        mapper.drain(&mut queue, &mut camera, &mut tool);

        assert!(queue.is_empty());
        assert_ne!(camera.model_rotation(), before);
        assert!(!tool.active);
        assert!(!tool.brush().active);
    }

    #[test]
    fn sculpt_mode_moves_the_brush_instead_of_rotating() {
        let mut camera = CameraRig::new(800, 600);
        let mut tool = ToolState {
            sculpt_mode: true,
            ..ToolState::default()
        };
        let mut mapper = GestureMapper::new(800, 600);
        let mut queue = InputQueue::default();

        let before = camera.model_rotation();
        drag(&mut queue, 1, (0.0, 0.0), (0.5, -0.5));
        mapper.drain(&mut queue, &mut camera, &mut tool);

        assert_eq!(camera.model_rotation(), before);
        assert!(tool.brush().active);
        assert_eq!(tool.plane, Vec2::new(0.75, 0.25));

        queue.push(GestureEvent::new(GestureKind::End, 1, 0.5, -0.5));
        mapper.drain(&mut queue, &mut camera, &mut tool);
        assert!(!tool.brush().active);
    }

    #[test]
    fn two_pointers_zoom_and_never_sculpt() {
        let mut camera = CameraRig::new(800, 600);
        let mut tool = ToolState {
            sculpt_mode: true,
            ..ToolState::default()
        };
        let mut mapper = GestureMapper::new(800, 600);
        let mut queue = InputQueue::default();

        let rotation = camera.model_rotation();
        queue.push(GestureEvent::new(GestureKind::Start, 2, 0.0, 0.0));
        queue.push(GestureEvent::new(GestureKind::Move, 2, 0.0, 0.0).with_pinch(20.0));
        mapper.drain(&mut queue, &mut camera, &mut tool);
        assert_eq!(camera.distance(), 130.0);
        assert!(!tool.brush().active);
        assert_eq!(camera.model_rotation(), rotation);

        // No pinch: dx + dy in pixels. 0.1 in x on an 800 wide view is 40 px.
        queue.push(GestureEvent::new(GestureKind::Move, 2, 0.1, 0.0));
        mapper.drain(&mut queue, &mut camera, &mut tool);
        assert!((camera.distance() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn mouse_buttons_map_to_pointer_counts() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(200, 100));
        let mut queue = InputQueue::default();

        tracker.handle_event(
            &WindowEvent::CursorMoved {
                device_id: unsafe { winit::event::DeviceId::dummy() },
                position: PhysicalPosition::new(100.0, 50.0),
            },
            &mut queue,
        );
        assert!(queue.is_empty(), "hover must not produce gestures");

        tracker.handle_event(
            &WindowEvent::MouseInput {
                device_id: unsafe { winit::event::DeviceId::dummy() },
                state: ElementState::Pressed,
                button: MouseButton::Right,
            },
            &mut queue,
        );
        tracker.handle_event(
            &WindowEvent::CursorMoved {
                device_id: unsafe { winit::event::DeviceId::dummy() },
                position: PhysicalPosition::new(150.0, 0.0),
            },
            &mut queue,
        );

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], GestureEvent::new(GestureKind::Start, 2, 0.0, 0.0));
        assert_eq!(events[1], GestureEvent::new(GestureKind::Move, 2, 0.5, 1.0));
    }

    #[test]
    fn release_and_cursor_exit_end_the_drag() {
        let device_id = unsafe { winit::event::DeviceId::dummy() };
        let press = WindowEvent::MouseInput {
            device_id,
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        let release = WindowEvent::MouseInput {
            device_id,
            state: ElementState::Released,
            button: MouseButton::Left,
        };
        let moved = WindowEvent::CursorMoved {
            device_id,
            position: PhysicalPosition::new(20.0, 20.0),
        };
        let left = WindowEvent::CursorLeft { device_id };

        assert!(ends_gesture(&release));
        assert!(ends_gesture(&left));
        assert!(!ends_gesture(&press));
        assert!(!ends_gesture(&moved));

        let mut tracker = PointerTracker::new(PhysicalSize::new(200, 100));
        let mut queue = InputQueue::default();
        tracker.handle_event(&press, &mut queue);
        tracker.handle_event(&left, &mut queue);
        tracker.handle_event(&moved, &mut queue);

        let kinds: Vec<_> = queue.drain().map(|e| e.kind).collect();
        assert_eq!(kinds, [GestureKind::Start, GestureKind::End]);

        // Released after the drag already ended: nothing further.
        tracker.handle_event(&release, &mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn wheel_zooms_one_unit_per_notch() {
        let mut tracker = PointerTracker::new(PhysicalSize::new(200, 100));
        let mut queue = InputQueue::default();
        tracker.handle_event(
            &WindowEvent::MouseWheel {
                device_id: unsafe { winit::event::DeviceId::dummy() },
                delta: MouseScrollDelta::LineDelta(0.0, 3.0),
                phase: TouchPhase::Moved,
            },
            &mut queue,
        );

        let mut camera = CameraRig::new(200, 100);
        let mut tool = ToolState::default();
        GestureMapper::new(200, 100).drain(&mut queue, &mut camera, &mut tool);
        assert_eq!(camera.distance(), 147.0);
    }
}
