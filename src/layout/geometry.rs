#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Point { x, y }
	}

	pub fn distance(&self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn centered(center: Point, width: f64, height: f64) -> Self {
		Rect {
			x: center.x - width / 2.0,
			y: center.y - height / 2.0,
			width,
			height,
		}
	}

	pub fn center(&self) -> Point {
		Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
	}

	/// Grows the rectangle by `d` on every side; negative `d` shrinks it.
	pub fn inflate(&self, d: f64) -> Self {
		Rect {
			x: self.x - d,
			y: self.y - d,
			width: (self.width + 2.0 * d).max(0.0),
			height: (self.height + 2.0 * d).max(0.0),
		}
	}

	pub fn union(&self, other: &Rect) -> Self {
		let x = self.x.min(other.x);
		let y = self.y.min(other.y);
		Rect {
			x,
			y,
			width: self.right().max(other.right()) - x,
			height: self.bottom().max(other.bottom()) - y,
		}
	}

	/// Overlap along each axis, or `None` when the rectangles are apart.
	pub fn overlap(&self, other: &Rect) -> Option<(f64, f64)> {
		let ox = self.right().min(other.right()) - self.x.max(other.x);
		let oy = self.bottom().min(other.bottom()) - self.y.max(other.y);
		(ox > 0.0 && oy > 0.0).then_some((ox, oy))
	}

	/// Where the segment from the center toward `toward` leaves the
	/// rectangle. Points inside the rectangle are returned unchanged.
	pub fn boundary_toward(&self, toward: Point) -> Point {
		let c = self.center();
		let (dx, dy) = (toward.x - c.x, toward.y - c.y);
		let tx = if dx != 0.0 {
			self.width / 2.0 / dx.abs()
		} else {
			f64::INFINITY
		};
		let ty = if dy != 0.0 {
			self.height / 2.0 / dy.abs()
		} else {
			f64::INFINITY
		};
		let t = tx.min(ty).min(1.0);
		Point::new(c.x + dx * t, c.y + dy * t)
	}
}

/// Smallest rectangle holding every input, if any.
pub fn bounding(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
	rects.into_iter().reduce(|a, b| a.union(&b))
}

/// Endpoints of the straight line between two boxes, clipped to each box's
/// border.
pub fn edge_between(source: &Rect, target: &Rect) -> (Point, Point) {
	(
		source.boundary_toward(target.center()),
		target.boundary_toward(source.center()),
	)
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len2 = dx * dx + dy * dy;
	if len2 == 0.0 {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
	p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

pub fn distance_to_polyline(p: Point, points: &[Point]) -> f64 {
	match points {
		[] => f64::INFINITY,
		[only] => p.distance(*only),
		_ => points
			.windows(2)
			.map(|w| distance_to_segment(p, w[0], w[1]))
			.fold(f64::INFINITY, f64::min),
	}
}

/// Samples a centripetal Catmull-Rom spline through `points`.
///
/// The curve passes through every control point; `samples` points are
/// emitted per segment plus the final control point.
pub fn catmull_rom(points: &[Point], samples: usize) -> Vec<Point> {
	if points.len() < 3 || samples == 0 {
		return points.to_vec();
	}

	let reflect = |a: Point, b: Point| Point::new(2.0 * a.x - b.x, 2.0 * a.y - b.y);
	let n = points.len();
	let mut out = Vec::with_capacity((n - 1) * samples + 1);

	for i in 0..n - 1 {
		let p1 = points[i];
		let p2 = points[i + 1];
		let p0 = if i == 0 { reflect(p1, p2) } else { points[i - 1] };
		let p3 = if i + 2 < n {
			points[i + 2]
		} else {
			reflect(p2, p1)
		};
		for s in 0..samples {
			out.push(centripetal(p0, p1, p2, p3, s as f64 / samples as f64));
		}
	}
	out.push(points[n - 1]);
	out
}

/// Point at fraction `u` of the segment `p1 -> p2`.
fn centripetal(p0: Point, p1: Point, p2: Point, p3: Point, u: f64) -> Point {
	let knot = |a: Point, b: Point| a.distance(b).sqrt().max(1e-6);
	let t0 = 0.0;
	let t1 = t0 + knot(p0, p1);
	let t2 = t1 + knot(p1, p2);
	let t3 = t2 + knot(p2, p3);
	let t = t1 + (t2 - t1) * u;

	let mix = |a: Point, b: Point, ta: f64, tb: f64| {
		let (wa, wb) = ((tb - t) / (tb - ta), (t - ta) / (tb - ta));
		Point::new(wa * a.x + wb * b.x, wa * a.y + wb * b.y)
	};
	let a1 = mix(p0, p1, t0, t1);
	let a2 = mix(p1, p2, t1, t2);
	let a3 = mix(p2, p3, t2, t3);
	let b1 = mix(a1, a2, t0, t2);
	let b2 = mix(a2, a3, t1, t3);
	mix(b1, b2, t1, t2)
}
