use std::sync::Arc;

use super::Rect;

/// Horizontal band of identical spans, `top..bottom` exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
struct Band {
    top: i32,
    bottom: i32,
    /// Sorted, non-touching `[x0, x1)` intervals
    spans: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Union,
    Intersect,
    Subtract,
}

impl Op {
    fn keep(self, in_a: bool, in_b: bool) -> bool {
        match self {
            Op::Union => in_a || in_b,
            Op::Intersect => in_a && in_b,
            Op::Subtract => in_a && !in_b,
        }
    }
}

/// Immutable set of non-overlapping rectangles
///
/// Stored in canonical y-x banded form, so two regions covering the same
/// pixels compare equal. Clones share storage; every operation returns a new
/// region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    bands: Arc<Vec<Band>>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        Self {
            bands: Arc::new(vec![Band {
                top: rect.top(),
                bottom: rect.bottom(),
                spans: vec![(rect.left(), rect.right())],
            }]),
        }
    }

    pub fn from_rects<I: IntoIterator<Item = Rect>>(rects: I) -> Self {
        rects
            .into_iter()
            .fold(Self::new(), |acc, r| acc.union(&Self::from_rect(r)))
    }

    /// Build from one-pixel-high rows of spans, sorted by `y`
    pub(crate) fn from_rows(rows: Vec<(i32, Vec<(i32, i32)>)>) -> Self {
        let mut bands: Vec<Band> = Vec::new();
        for (y, spans) in rows {
            let spans = normalize_spans(spans);
            push_band(&mut bands, y, y + 1, spans);
        }
        Self {
            bands: Arc::new(bands),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Rectangles in y-x order, one per span per band
    pub fn rects(&self) -> Vec<Rect> {
        self.bands
            .iter()
            .flat_map(|band| {
                band.spans
                    .iter()
                    .map(move |&(x0, x1)| Rect::new(x0, band.top, x1 - x0, band.bottom - band.top))
            })
            .collect()
    }

    /// Smallest rectangle containing the region
    pub fn bounds(&self) -> Rect {
        let (Some(first), Some(last)) = (self.bands.first(), self.bands.last()) else {
            return Rect::default();
        };
        let x0 = self
            .bands
            .iter()
            .filter_map(|b| b.spans.first().map(|s| s.0))
            .min()
            .unwrap_or(0);
        let x1 = self
            .bands
            .iter()
            .filter_map(|b| b.spans.last().map(|s| s.1))
            .max()
            .unwrap_or(0);
        Rect::new(x0, first.top, x1 - x0, last.bottom - first.top)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        band_at(&self.bands, y).is_some_and(|band| covers(&band.spans, x))
    }

    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        self.combine(other, Op::Union)
    }

    pub fn intersect(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() {
            return Region::new();
        }
        self.combine(other, Op::Intersect)
    }

    pub fn subtract(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        self.combine(other, Op::Subtract)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        if dx == 0 && dy == 0 {
            return self.clone();
        }
        let bands = self
            .bands
            .iter()
            .map(|b| Band {
                top: b.top + dy,
                bottom: b.bottom + dy,
                spans: b.spans.iter().map(|&(x0, x1)| (x0 + dx, x1 + dx)).collect(),
            })
            .collect();
        Region {
            bands: Arc::new(bands),
        }
    }

    /// `true` when every pixel of `self` is also in `other`
    pub fn is_subset_of(&self, other: &Region) -> bool {
        self.subtract(other).is_empty()
    }

    fn combine(&self, other: &Region, op: Op) -> Region {
        let mut ys: Vec<i32> = self
            .bands
            .iter()
            .chain(other.bands.iter())
            .flat_map(|b| [b.top, b.bottom])
            .collect();
        ys.sort_unstable();
        ys.dedup();

        let empty: Vec<(i32, i32)> = Vec::new();
        let mut bands = Vec::new();
        for w in ys.windows(2) {
            let (y0, y1) = (w[0], w[1]);
            let a = band_at(&self.bands, y0).map_or(&empty, |b| &b.spans);
            let b = band_at(&other.bands, y0).map_or(&empty, |b| &b.spans);
            push_band(&mut bands, y0, y1, combine_spans(a, b, op));
        }
        Region {
            bands: Arc::new(bands),
        }
    }
}

fn band_at(bands: &[Band], y: i32) -> Option<&Band> {
    let idx = bands.partition_point(|b| b.bottom <= y);
    bands.get(idx).filter(|b| b.top <= y)
}

fn covers(spans: &[(i32, i32)], x: i32) -> bool {
    let idx = spans.partition_point(|s| s.1 <= x);
    spans.get(idx).is_some_and(|s| s.0 <= x)
}

fn combine_spans(a: &[(i32, i32)], b: &[(i32, i32)], op: Op) -> Vec<(i32, i32)> {
    let mut xs: Vec<i32> = a.iter().chain(b.iter()).flat_map(|&(x0, x1)| [x0, x1]).collect();
    xs.sort_unstable();
    xs.dedup();

    let mut out: Vec<(i32, i32)> = Vec::new();
    for w in xs.windows(2) {
        let (x0, x1) = (w[0], w[1]);
        if !op.keep(covers(a, x0), covers(b, x0)) {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.1 == x0 => last.1 = x1,
            _ => out.push((x0, x1)),
        }
    }
    out
}

fn normalize_spans(mut spans: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    spans.retain(|s| s.1 > s.0);
    spans.sort_unstable();
    let mut out: Vec<(i32, i32)> = Vec::with_capacity(spans.len());
    for (x0, x1) in spans {
        match out.last_mut() {
            Some(last) if last.1 >= x0 => last.1 = last.1.max(x1),
            _ => out.push((x0, x1)),
        }
    }
    out
}

fn push_band(bands: &mut Vec<Band>, top: i32, bottom: i32, spans: Vec<(i32, i32)>) {
    if spans.is_empty() || bottom <= top {
        return;
    }
    if let Some(last) = bands.last_mut()
        && last.bottom == top
        && last.spans == spans
    {
        last.bottom = bottom;
        return;
    }
    bands.push(Band { top, bottom, spans });
}
