// crates/reelmux-core/src/geometry.rs
//
// Pixel-aspect-ratio scaling per spec.md §6. Terminal character cells are
// taller than they are wide, so a source frame's width is pre-multiplied by
// PAR_HEIGHT and its height by PAR_WIDTH before bounding — this cancels the
// cell's own aspect distortion so the displayed picture keeps its true shape.
//
// Modeled on velocut-core/src/helpers/geometry.rs's role (aspect helpers
// shared across crate boundaries) but grounded on the source project's
// `get_bounded_dimensions` (include/scale.h): fit-within, never upscale.

/// Pixel aspect ratio of one terminal character cell: narrower than tall.
pub const PAR_WIDTH: u32 = 2;
pub const PAR_HEIGHT: u32 = 5;

pub const MAX_FRAME_ASPECT_RATIO_WIDTH: u32 = 16 * PAR_HEIGHT;
pub const MAX_FRAME_ASPECT_RATIO_HEIGHT: u32 = 9 * PAR_WIDTH;

/// Past this many character columns most terminal emulators start to
/// stutter badly, so the renderer's bitmap is never scaled wider than this
/// regardless of what it asks for.
pub const MAX_FRAME_WIDTH: u32 = 640;

/// `640 * 9*PAR_WIDTH / (16*PAR_HEIGHT)`, i.e. `MAX_FRAME_WIDTH` bounded by
/// the same aspect ratio used for request-dimension bounding.
pub const MAX_FRAME_HEIGHT: u32 =
    (MAX_FRAME_WIDTH * MAX_FRAME_ASPECT_RATIO_HEIGHT) / MAX_FRAME_ASPECT_RATIO_WIDTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dim2 {
    pub width: u32,
    pub height: u32,
}

impl Dim2 {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Fit `(src_width, src_height)` inside `(max_width, max_height)` preserving
/// aspect ratio. Never upscales: if the source already fits, it is returned
/// unchanged.
pub fn bound_dims(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> Dim2 {
    if src_width == 0 || src_height == 0 || max_width == 0 || max_height == 0 {
        return Dim2::new(src_width.min(max_width), src_height.min(max_height));
    }

    if src_width <= max_width && src_height <= max_height {
        return Dim2::new(src_width, src_height);
    }

    let width_ratio = max_width as f64 / src_width as f64;
    let height_ratio = max_height as f64 / src_height as f64;
    let scale = width_ratio.min(height_ratio);

    let width = ((src_width as f64 * scale).round() as u32).max(1);
    let height = ((src_height as f64 * scale).round() as u32).max(1);
    Dim2::new(width, height)
}

/// Apply spec.md §6's full bounding rule: pixel-aspect-correct the source
/// dimensions, then bound into the caller-requested dims, then bound again
/// into the absolute `MAX_FRAME_WIDTH`/`MAX_FRAME_HEIGHT` ceiling.
pub fn bound_for_terminal(src_width: u32, src_height: u32, req: Option<Dim2>) -> Dim2 {
    let par_corrected = bound_dims(
        src_width * PAR_HEIGHT,
        src_height * PAR_WIDTH,
        req.map(|d| d.width).unwrap_or(MAX_FRAME_WIDTH),
        req.map(|d| d.height).unwrap_or(MAX_FRAME_HEIGHT),
    );
    bound_dims(
        par_corrected.width,
        par_corrected.height,
        MAX_FRAME_WIDTH,
        MAX_FRAME_HEIGHT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_inside_bounds_unchanged() {
        let d = bound_dims(100, 50, 640, 480);
        assert_eq!(d, Dim2::new(100, 50));
    }

    #[test]
    fn never_upscales() {
        let d = bound_dims(10, 10, 640, 480);
        assert_eq!(d, Dim2::new(10, 10));
    }

    #[test]
    fn downscales_preserving_aspect() {
        // 2000x1000 (2:1) bounded into 640x640 -> 640x320
        let d = bound_dims(2000, 1000, 640, 640);
        assert_eq!(d.width, 640);
        assert_eq!(d.height, 320);
    }

    #[test]
    fn max_frame_height_matches_spec_formula() {
        assert_eq!(MAX_FRAME_WIDTH, 640);
        // 640 * 9*2 / (16*5) = 640 * 18 / 80 = 144
        assert_eq!(MAX_FRAME_HEIGHT, 144);
    }

    #[test]
    fn bound_for_terminal_never_exceeds_absolute_max() {
        let d = bound_for_terminal(4000, 3000, None);
        assert!(d.width <= MAX_FRAME_WIDTH);
        assert!(d.height <= MAX_FRAME_HEIGHT);
    }
}
