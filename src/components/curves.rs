//! Quadratic curve storage and control-point hit testing.

/// A press within this many pixels (exclusive) of a control point grabs it.
pub const HIT_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlPoint {
    pub x: f32,
    pub y: f32,
}

/// Quadratic Bézier segment: start, control, end.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub points: [ControlPoint; 3],
}

impl Curve {
    pub fn start(&self) -> ControlPoint {
        self.points[0]
    }

    pub fn control(&self) -> ControlPoint {
        self.points[1]
    }

    pub fn end(&self) -> ControlPoint {
        self.points[2]
    }
}

/// Index of one control point inside the store: (curve, point 0..3).
/// Stays valid until the store is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointRef {
    pub curve: usize,
    pub point: usize,
}

/// Completed curves plus up to two points waiting for a third.
#[derive(Clone, Debug, Default)]
pub struct CurveStore {
    pending: Vec<ControlPoint>,
    curves: Vec<Curve>,
}

impl CurveStore {
    /// Queue a control point. The third point atomically becomes a new curve
    /// and the queue resets; the new curve's index is returned.
    pub fn add_control_point(&mut self, x: f32, y: f32) -> Option<usize> {
        self.pending.push(ControlPoint { x, y });
        if self.pending.len() < 3 {
            return None;
        }
        let points = [self.pending[0], self.pending[1], self.pending[2]];
        self.pending.clear();
        self.curves.push(Curve { points });
        Some(self.curves.len() - 1)
    }

    /// First control point, in insertion order, strictly closer than
    /// `HIT_RADIUS` to (x, y).
    pub fn hit_test(&self, x: f32, y: f32) -> Option<PointRef> {
        self.curves.iter().enumerate().find_map(|(ci, curve)| {
            curve
                .points
                .iter()
                .position(|p| (p.x - x).hypot(p.y - y) < HIT_RADIUS)
                .map(|pi| PointRef { curve: ci, point: pi })
        })
    }

    pub fn point(&self, at: PointRef) -> Option<ControlPoint> {
        self.curves.get(at.curve)?.points.get(at.point).copied()
    }

    /// Move a control point in place. Returns false for a stale reference.
    pub fn move_point(&mut self, at: PointRef, x: f32, y: f32) -> bool {
        match self
            .curves
            .get_mut(at.curve)
            .and_then(|c| c.points.get_mut(at.point))
        {
            Some(p) => {
                p.x = x;
                p.y = y;
                true
            }
            None => false,
        }
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn pending(&self) -> &[ControlPoint] {
        &self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.curves.clear();
    }
}
