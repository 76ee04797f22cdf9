//! Geometry for credit circles.
//!
//! All layouts are computed in a surface's local space. Surfaces translate
//! them to screen space when registering with the
//! [`ElementRegistry`](crate::registry::ElementRegistry).

use quadra_shared::QuestionId;

/// A rectangle in screen or local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// X position (left edge).
    pub x: f32,
    /// Y position (top edge).
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// A zero-sized rect at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Returns the smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Self::new(x, y, right - x, bottom - y)
    }

    /// Moves the rectangle by `(dx, dy)`.
    #[must_use]
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// A circle: center plus radius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Circle {
    /// Center X.
    pub x: f32,
    /// Center Y.
    pub y: f32,
    /// Radius.
    pub r: f32,
}

impl Circle {
    /// Creates a new circle.
    #[must_use]
    pub const fn new(x: f32, y: f32, r: f32) -> Self {
        Self { x, y, r }
    }

    /// Returns the center point.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Returns the bounding box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x - self.r, self.y - self.r, self.r * 2.0, self.r * 2.0)
    }

    /// Moves the circle by `(dx, dy)`.
    #[must_use]
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.r)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.r.is_finite()
    }
}

/// One circle of a diamond.
#[derive(Debug, Clone, PartialEq)]
pub struct DiamondPoint {
    /// Geometry in diamond-local space.
    pub circle: Circle,
    /// Vote level this point belongs to, 1-based.
    pub level: u32,
    /// Index within the level, 0-based.
    pub index: u32,
    /// Stable level key: `"<id>-<level>"`.
    pub key: String,
}

/// Largest level whose square fits in `credits`.
fn max_level(credits: u32) -> u32 {
    let mut level = 0u32;
    while (level + 1) * (level + 1) <= credits {
        level += 1;
    }
    level
}

/// Computes every point of the diamond for question `id`.
///
/// Level `L` has `2L - 1` points and starts at `(-4rL, 0)`, then zigzags:
/// after an even index the next point moves right by `2r` and up to
/// `-|cy| - 2r`, after an odd index it mirrors down to `|cy|`.
///
/// ```text
///            ●
///         ●     ●
///   ●  ●     ●     ●   ...
///         ●     ●
///            ●
/// ```
#[must_use]
pub fn diamond_layout(id: &QuestionId, credits: u32, radius: f32) -> Vec<DiamondPoint> {
    let levels = max_level(credits);
    let mut points = Vec::with_capacity((levels * levels) as usize);

    for level in 1..=levels {
        #[allow(clippy::cast_precision_loss)]
        let mut cx = -radius * 4.0 * level as f32;
        let mut cy = 0.0_f32;
        let key = format!("{id}-{level}");

        for index in 0..(2 * level - 1) {
            points.push(DiamondPoint {
                circle: Circle::new(cx, cy, radius),
                level,
                index,
                key: key.clone(),
            });

            if index % 2 == 0 {
                cx += radius * 2.0;
                cy = -cy.abs() - radius * 2.0;
            } else {
                cy = cy.abs();
            }
        }
    }

    points
}

/// Lays out one pool circle per credit, row-major.
#[must_use]
pub fn pool_grid(credits: u32, columns: u32, radius: f32, spacing: f32) -> Vec<Circle> {
    let columns = columns.max(1);
    let step = radius * 2.0 + spacing;

    (0..credits)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let (column, row) = ((i % columns) as f32, (i / columns) as f32);
            Circle::new(column * step + radius, row * step + radius, radius)
        })
        .collect()
}

/// Returns the minimal rectangle enclosing every circle.
///
/// Non-finite circles are skipped; with nothing left the result is
/// [`Rect::ZERO`].
#[must_use]
pub fn bounding_viewport<'a>(circles: impl IntoIterator<Item = &'a Circle>) -> Rect {
    circles
        .into_iter()
        .filter(|c| c.is_finite())
        .map(Circle::bounds)
        .reduce(|acc, bounds| acc.union(&bounds))
        .unwrap_or(Rect::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diamond_for_100_credits() {
        let points = diamond_layout(&QuestionId::Int(0), 100, 4.0);
        assert_eq!(points.len(), 100);

        for level in 1..=10u32 {
            let at_level: Vec<_> = points.iter().filter(|p| p.level == level).collect();
            assert_eq!(at_level.len() as u32, 2 * level - 1);

            let indices: Vec<u32> = at_level.iter().map(|p| p.index).collect();
            let expected: Vec<u32> = (0..2 * level - 1).collect();
            assert_eq!(indices, expected);
            assert!(at_level.iter().all(|p| p.key == format!("0-{level}")));
        }
    }

    #[test]
    fn test_diamond_zigzag() {
        let points = diamond_layout(&QuestionId::from("q"), 4, 4.0);
        let centers: Vec<(f32, f32)> = points.iter().map(|p| p.circle.center()).collect();

        assert_eq!(
            centers,
            vec![(-16.0, 0.0), (-32.0, 0.0), (-24.0, -8.0), (-24.0, 8.0)]
        );
    }

    #[test]
    fn test_diamond_truncates_partial_levels() {
        // sqrt(10) ≈ 3.16 → three full levels
        assert_eq!(diamond_layout(&QuestionId::Int(1), 10, 4.0).len(), 9);
        assert_eq!(max_level(225), 15);
    }

    #[test]
    fn test_pool_grid() {
        let circles = pool_grid(7, 5, 4.0, 4.0);
        assert_eq!(circles.len(), 7);
        assert_eq!(circles[0], Circle::new(4.0, 4.0, 4.0));
        assert_eq!(circles[4], Circle::new(52.0, 4.0, 4.0));
        assert_eq!(circles[5], Circle::new(4.0, 16.0, 4.0));
    }

    #[test]
    fn test_bounding_viewport() {
        let circles = [Circle::new(0.0, 0.0, 2.0), Circle::new(10.0, 5.0, 1.0)];
        assert_eq!(
            bounding_viewport(&circles),
            Rect::new(-2.0, -2.0, 13.0, 8.0)
        );
    }

    #[test]
    fn test_bounding_viewport_degenerate_input() {
        assert_eq!(bounding_viewport(&[] as &[Circle]), Rect::ZERO);
        assert_eq!(
            bounding_viewport(&[Circle::new(f32::NAN, 0.0, 1.0)]),
            Rect::ZERO
        );
    }

    #[test]
    fn test_rect_union() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);

        let other = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(rect.union(&other), Rect::new(0.0, 0.0, 15.0, 15.0));
        assert_eq!(rect.translate(1.0, 2.0).center(), (6.0, 7.0));
    }
}
