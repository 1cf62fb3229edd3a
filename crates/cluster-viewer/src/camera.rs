use glam::{Mat4, Vec3, Vec4};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Initial zoom-out applied by `reset_view`.
const INITIAL_SCALE: f32 = 0.01;

/// Uniform scale contributed by one wheel unit (Qt-style units, 120 per
/// notch): `2^(delta / 400)`, so a delta of 400 doubles the view scale.
const WHEEL_DOUBLING_UNITS: f32 = 400.0;

/// Exclusive mouse interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Idle,
    Rotating,
    Zooming,
}

/// Interactive view-transform state.
///
/// Two matrices drive the camera: `committed` accumulates all finished
/// interactions, `incremental` holds only the in-progress drag. A drag
/// commits on release of its starting button (`committed = incremental *
/// committed`); the wheel bypasses the incremental cycle and scales the
/// committed transform directly.
pub struct ViewState {
    committed: Mat4,
    incremental: Mat4,
    mode: DragMode,
    /// Cursor position at the start of the active drag.
    press: (f64, f64),
    /// Latest cursor position; winit button events carry no position.
    cursor: (f64, f64),
    width: f32,
    height: f32,
}

impl ViewState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            committed: initial_view(),
            incremental: Mat4::IDENTITY,
            mode: DragMode::Idle,
            press: (0.0, 0.0),
            cursor: (0.0, 0.0),
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    /// Recomputes the home view and clears any in-progress drag's visual
    /// effect. Does not end an active drag mode; the next mouse move
    /// rebuilds the incremental transform from the same press point.
    pub fn reset_view(&mut self) {
        self.committed = initial_view();
        self.incremental = Mat4::IDENTITY;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// The view transform excluding any in-progress drag.
    pub fn committed(&self) -> Mat4 {
        self.committed
    }

    /// Full view transform for a mesh centered by `center_offset`.
    pub fn view_for(&self, center_offset: Vec3) -> Mat4 {
        self.incremental * self.committed * Mat4::from_translation(center_offset)
    }

    /// Orthographic projection, aspect-corrected so content fits without
    /// distortion on non-square viewports. The Z row flips depth and lands
    /// it in wgpu's [0, 1] clip range.
    pub fn projection(&self) -> Mat4 {
        let mut proj = Mat4::IDENTITY;
        proj.x_axis.x = (self.height / self.width).min(1.0);
        proj.y_axis.y = (self.width / self.height).min(1.0);
        proj.z_axis.z = -0.01;
        proj.w_axis.z = 0.5;
        proj
    }

    /// Translates winit window events into view-state transitions. Returns
    /// `true` if the event changed the view.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => self.mouse_down(*button),
                ElementState::Released => self.mouse_up(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_move(position.x, position.y)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let units = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * 120.0,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                self.wheel(units);
                true
            }
            _ => false,
        }
    }

    /// Starts a drag. Ignored while another drag is active.
    pub fn mouse_down(&mut self, button: MouseButton) -> bool {
        if self.mode != DragMode::Idle {
            return false;
        }

        self.mode = match button {
            MouseButton::Left => DragMode::Rotating,
            MouseButton::Right => DragMode::Zooming,
            _ => return false,
        };
        self.press = self.cursor;
        true
    }

    /// Ends the active drag if `button` matches the one that started it,
    /// committing the incremental transform.
    pub fn mouse_up(&mut self, button: MouseButton) -> bool {
        let matching = matches!(
            (self.mode, button),
            (DragMode::Rotating, MouseButton::Left) | (DragMode::Zooming, MouseButton::Right)
        );
        if !matching {
            return false;
        }

        self.committed = self.incremental * self.committed;
        self.incremental = Mat4::IDENTITY;
        self.mode = DragMode::Idle;
        true
    }

    /// Tracks the cursor; while a drag is active, rebuilds the incremental
    /// transform from the displacement since the press point.
    pub fn mouse_move(&mut self, x: f64, y: f64) -> bool {
        self.cursor = (x, y);
        if self.mode == DragMode::Idle {
            return false;
        }

        let dx = (x - self.press.0) as f32;
        let dy = (y - self.press.1) as f32;

        if dx == 0.0 && dy == 0.0 {
            self.incremental = Mat4::IDENTITY;
            return true;
        }

        match self.mode {
            DragMode::Rotating => {
                // Horizontal motion spins about the world Z axis as the
                // committed view currently shows it, flipped when it points
                // below the horizon so the spin direction never inverts.
                let mut axis_z = (self.committed * Vec4::new(0.0, 0.0, 1.0, 0.0))
                    .truncate()
                    .normalize();
                if axis_z.y < 0.0 {
                    axis_z = -axis_z;
                }
                let angle_z = dx / self.width * 4.0 * std::f32::consts::PI;
                let rot_z = Mat4::from_axis_angle(axis_z, angle_z);

                // Vertical motion tilts about the view-space X axis.
                let angle_x = dy / self.height * 2.0 * std::f32::consts::PI;
                self.incremental = Mat4::from_axis_angle(Vec3::X, angle_x) * rot_z;
            }
            DragMode::Zooming => {
                let scale = 2.0f32.powf(-dy / 100.0);
                self.incremental = Mat4::from_scale(Vec3::splat(scale));
            }
            DragMode::Idle => unreachable!(),
        }

        true
    }

    /// Scales the committed transform immediately, no drag required.
    pub fn wheel(&mut self, delta_units: f32) {
        let scale = 2.0f32.powf(delta_units / WHEEL_DOUBLING_UNITS);
        self.committed = Mat4::from_scale(Vec3::splat(scale)) * self.committed;
    }
}

/// Home view: zoom out, then orient the camera to look along the world
/// direction (1, 1, -1) with +Z up.
fn initial_view() -> Mat4 {
    let look_dir = Vec3::new(1.0, 1.0, -1.0).normalize();
    let rot = Mat4::look_to_rh(Vec3::ZERO, look_dir, Vec3::Z);
    rot * Mat4::from_scale(Vec3::splat(INITIAL_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn view() -> ViewState {
        ViewState::new(800, 600)
    }

    #[test]
    fn wheel_delta_400_doubles_the_committed_scale() {
        let mut v = view();
        let before = v.committed();

        v.wheel(400.0);

        let expected = Mat4::from_scale(Vec3::splat(2.0)) * before;
        assert!(v.committed().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn zero_displacement_drag_commits_nothing() {
        let mut v = view();
        let before = v.committed();

        v.mouse_move(100.0, 100.0);
        v.mouse_down(MouseButton::Left);
        v.mouse_move(140.0, 90.0);
        v.mouse_move(100.0, 100.0);
        v.mouse_up(MouseButton::Left);

        assert_eq!(v.mode(), DragMode::Idle);
        assert!(v.committed().abs_diff_eq(before, EPS));
    }

    #[test]
    fn completed_rotate_drag_commits_and_resets_incremental() {
        let mut v = view();
        let before = v.committed();

        v.mouse_move(100.0, 100.0);
        v.mouse_down(MouseButton::Left);
        v.mouse_move(300.0, 100.0);
        v.mouse_up(MouseButton::Left);

        assert!(!v.committed().abs_diff_eq(before, EPS));
        // After committing, the full view equals the committed view.
        assert!(v
            .view_for(Vec3::ZERO)
            .abs_diff_eq(v.committed(), EPS));
    }

    #[test]
    fn zoom_drag_of_minus_100_pixels_doubles_scale() {
        let mut v = view();
        let before = v.committed();

        v.mouse_move(50.0, 200.0);
        v.mouse_down(MouseButton::Right);
        v.mouse_move(50.0, 100.0);
        v.mouse_up(MouseButton::Right);

        let expected = Mat4::from_scale(Vec3::splat(2.0)) * before;
        assert!(v.committed().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn drag_modes_are_mutually_exclusive() {
        let mut v = view();

        assert!(v.mouse_down(MouseButton::Left));
        assert_eq!(v.mode(), DragMode::Rotating);

        // A second press while dragging is ignored.
        assert!(!v.mouse_down(MouseButton::Right));
        assert_eq!(v.mode(), DragMode::Rotating);

        // So is releasing the button that didn't start the drag.
        assert!(!v.mouse_up(MouseButton::Right));
        assert_eq!(v.mode(), DragMode::Rotating);

        assert!(v.mouse_up(MouseButton::Left));
        assert_eq!(v.mode(), DragMode::Idle);
    }

    #[test]
    fn reset_view_restores_the_home_transform_mid_drag() {
        let mut v = view();
        let home = v.committed();

        v.wheel(400.0);
        v.mouse_down(MouseButton::Left);
        v.mouse_move(250.0, 250.0);
        v.reset_view();

        assert!(v.committed().abs_diff_eq(home, EPS));
        // The drag's visual effect collapses but its mode survives.
        assert_eq!(v.mode(), DragMode::Rotating);
        assert!(v.view_for(Vec3::ZERO).abs_diff_eq(home, EPS));
    }

    #[test]
    fn projection_corrects_for_aspect() {
        let mut v = ViewState::new(800, 400);
        let proj = v.projection();
        assert!((proj.x_axis.x - 0.5).abs() < EPS);
        assert!((proj.y_axis.y - 1.0).abs() < EPS);

        v.set_viewport(400, 800);
        let proj = v.projection();
        assert!((proj.x_axis.x - 1.0).abs() < EPS);
        assert!((proj.y_axis.y - 0.5).abs() < EPS);
    }

    #[test]
    fn view_includes_the_mesh_centering_translation() {
        let v = view();
        let offset = Vec3::new(1.0, 2.0, 3.0);
        let expected = v.committed() * Mat4::from_translation(offset);
        assert!(v.view_for(offset).abs_diff_eq(expected, EPS));
    }
}
