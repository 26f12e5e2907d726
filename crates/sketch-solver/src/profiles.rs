//! Closed-profile and path extraction from solved sketches.
//!
//! Lines and arcs form a graph over their end points. A connected component
//! in which every vertex has degree two is a closed loop; circles are loops on
//! their own. Loops nested inside other loops become holes, alternating with
//! depth. A component with exactly two degree-one vertices is an open path.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use history_types::{ElementId, Primitive, Sketch, Vec2};

use crate::types::ProfileError;

/// Segments used to polygonize a full circle.
pub const CIRCLE_SEGMENTS: usize = 32;

/// One face to build: an outer loop and the holes cut out of it.
/// Outer loops wind counter-clockwise, holes clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

#[derive(Debug, Clone)]
struct GraphEdge {
    from: ElementId,
    to: ElementId,
    /// Interior polyline points from `from` towards `to`.
    interior: Vec<Vec2>,
}

impl GraphEdge {
    fn other(&self, v: ElementId) -> ElementId {
        if self.from == v {
            self.to
        } else {
            self.from
        }
    }

    /// Points from `start` up to, but excluding, the far end.
    fn walk_from(&self, start: ElementId, start_pos: Vec2) -> Vec<Vec2> {
        let mut pts = vec![start_pos];
        if start == self.from {
            pts.extend(self.interior.iter().copied());
        } else {
            pts.extend(self.interior.iter().rev().copied());
        }
        pts
    }
}

fn position(sketch: &Sketch, point: ElementId) -> Result<Vec2, ProfileError> {
    sketch.solved(point).ok_or(ProfileError::MissingPosition { point })
}

/// Interior points of the counter-clockwise arc from `start` to `end`.
fn arc_interior(center: Vec2, start: Vec2, end: Vec2) -> Vec<Vec2> {
    let radius = center.distance(start);
    let a0 = (start.y - center.y).atan2(start.x - center.x);
    let a1 = (end.y - center.y).atan2(end.x - center.x);
    let mut sweep = a1 - a0;
    while sweep <= 1e-12 {
        sweep += TAU;
    }
    let steps = ((sweep / TAU) * CIRCLE_SEGMENTS as f64).ceil().max(1.0) as usize;
    (1..steps)
        .map(|i| {
            let a = a0 + sweep * i as f64 / steps as f64;
            Vec2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

fn circle_polygon(center: Vec2, radius: f64) -> Vec<Vec2> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let a = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            Vec2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Signed area by the shoelace formula. Positive = counter-clockwise.
pub fn signed_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Even-odd point-in-polygon test.
pub fn contains(polygon: &[Vec2], p: Vec2) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

struct EdgeGraph {
    edges: Vec<GraphEdge>,
    incident: BTreeMap<ElementId, Vec<usize>>,
}

impl EdgeGraph {
    fn build(sketch: &Sketch) -> Result<Self, ProfileError> {
        let mut edges = Vec::new();
        for primitive in sketch.primitives.values() {
            match primitive {
                Primitive::Line { start, end } => edges.push(GraphEdge {
                    from: *start,
                    to: *end,
                    interior: Vec::new(),
                }),
                Primitive::Arc { center, start, end } => edges.push(GraphEdge {
                    from: *start,
                    to: *end,
                    interior: arc_interior(
                        position(sketch, *center)?,
                        position(sketch, *start)?,
                        position(sketch, *end)?,
                    ),
                }),
                _ => {}
            }
        }
        let mut incident: BTreeMap<ElementId, Vec<usize>> = BTreeMap::new();
        for (i, e) in edges.iter().enumerate() {
            incident.entry(e.from).or_default().push(i);
            incident.entry(e.to).or_default().push(i);
        }
        Ok(Self { edges, incident })
    }

    /// Edge indices of each connected component.
    fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for start in 0..self.edges.len() {
            if !seen.insert(start) {
                continue;
            }
            let mut stack = vec![start];
            let mut component = Vec::new();
            while let Some(e) = stack.pop() {
                component.push(e);
                let edge = &self.edges[e];
                for v in [edge.from, edge.to] {
                    for &next in &self.incident[&v] {
                        if seen.insert(next) {
                            stack.push(next);
                        }
                    }
                }
            }
            out.push(component);
        }
        out
    }

    fn degree(&self, v: ElementId) -> usize {
        self.incident.get(&v).map_or(0, Vec::len)
    }

    fn vertices(&self, component: &[usize]) -> BTreeSet<ElementId> {
        component
            .iter()
            .flat_map(|&e| [self.edges[e].from, self.edges[e].to])
            .collect()
    }

    /// Walk a component from `start`, following unused edges.
    fn walk(&self, sketch: &Sketch, component: &[usize], start: ElementId) -> Result<Vec<Vec2>, ProfileError> {
        let mut used = BTreeSet::new();
        let mut points = Vec::new();
        let mut at = start;
        loop {
            let Some(&e) = self.incident[&at]
                .iter()
                .find(|&&e| component.contains(&e) && !used.contains(&e))
            else {
                break;
            };
            used.insert(e);
            points.extend(self.edges[e].walk_from(at, position(sketch, at)?));
            at = self.edges[e].other(at);
        }
        if at != start {
            points.push(position(sketch, at)?);
        }
        Ok(points)
    }
}

/// Every closed loop in the sketch, counter-clockwise.
pub fn closed_loops(sketch: &Sketch) -> Result<Vec<Vec<Vec2>>, ProfileError> {
    if !sketch.is_usable_profile() {
        return Err(ProfileError::NotSolved);
    }
    let mut loops = Vec::new();
    for (id, primitive) in &sketch.primitives {
        if let Primitive::Circle { center, .. } = primitive {
            let radius = sketch.radius(*id).unwrap_or_default();
            if radius > 0.0 {
                loops.push(circle_polygon(position(sketch, *center)?, radius));
            }
        }
    }

    let graph = EdgeGraph::build(sketch)?;
    for component in graph.components() {
        let vertices = graph.vertices(&component);
        if vertices.iter().any(|&v| graph.degree(v) != 2) {
            continue;
        }
        let Some(&start) = vertices.iter().next() else {
            continue;
        };
        let mut points = graph.walk(sketch, &component, start)?;
        let area = signed_area(&points);
        if area.abs() < 1e-12 {
            continue;
        }
        if area < 0.0 {
            points.reverse();
        }
        loops.push(points);
    }
    Ok(loops)
}

/// Group closed loops into outer regions with holes.
pub fn extract_regions(sketch: &Sketch) -> Result<Vec<Region>, ProfileError> {
    let mut loops = closed_loops(sketch)?;
    if loops.is_empty() {
        return Err(ProfileError::NoClosedLoop);
    }
    loops.sort_by(|a, b| signed_area(b).total_cmp(&signed_area(a)));

    let mut regions: Vec<Region> = Vec::new();
    // (depth, region index) of every loop already placed.
    let mut placed: Vec<(usize, usize)> = Vec::new();
    for (i, lp) in loops.iter().enumerate() {
        let sample = lp[0];
        // Largest-first order makes the last containing loop the innermost.
        let parent = (0..i).rev().find(|&j| contains(&loops[j], sample));
        let depth = parent.map_or(0, |j| placed[j].0 + 1);
        if depth % 2 == 0 {
            regions.push(Region {
                outer: lp.clone(),
                holes: Vec::new(),
            });
            placed.push((depth, regions.len() - 1));
        } else {
            let region = parent.map_or(0, |j| placed[j].1);
            let mut hole = lp.clone();
            hole.reverse();
            regions[region].holes.push(hole);
            placed.push((depth, region));
        }
    }
    Ok(regions)
}

/// The single open path formed by the sketch's lines and arcs.
pub fn extract_path(sketch: &Sketch) -> Result<Vec<Vec2>, ProfileError> {
    if !sketch.is_usable_profile() {
        return Err(ProfileError::NotSolved);
    }
    let graph = EdgeGraph::build(sketch)?;
    let components = graph.components();
    let [component] = components.as_slice() else {
        return Err(ProfileError::NoPath);
    };
    let vertices = graph.vertices(component);
    let ends: Vec<ElementId> = vertices.iter().copied().filter(|&v| graph.degree(v) == 1).collect();
    if ends.len() != 2 || vertices.iter().any(|&v| graph.degree(v) > 2) {
        return Err(ProfileError::NoPath);
    }
    graph.walk(sketch, component, ends[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use history_types::{PlaneId, SolveStatus};

    /// Mark every point as solved at its drawn position.
    fn solve_in_place(sketch: &mut Sketch) {
        let positions = sketch
            .primitives
            .iter()
            .filter_map(|(id, p)| match p {
                Primitive::Point { x, y } => Some((*id, Vec2::new(*x, *y))),
                _ => None,
            })
            .collect();
        sketch.solved_positions = Some(positions);
        sketch.solve_status = SolveStatus::UnderConstrained;
    }

    fn add_square(sketch: &mut Sketch, x0: f64, size: f64) {
        let a = sketch.add_point(x0, x0);
        let b = sketch.add_point(x0 + size, x0);
        let c = sketch.add_point(x0 + size, x0 + size);
        let d = sketch.add_point(x0, x0 + size);
        sketch.add_line(a, b);
        sketch.add_line(b, c);
        sketch.add_line(c, d);
        sketch.add_line(d, a);
    }

    #[test]
    fn clockwise_square_is_reoriented() {
        let mut sketch = Sketch::new("s", PlaneId::new());
        let a = sketch.add_point(0.0, 0.0);
        let b = sketch.add_point(0.0, 1.0);
        let c = sketch.add_point(1.0, 1.0);
        let d = sketch.add_point(1.0, 0.0);
        sketch.add_line(a, b);
        sketch.add_line(b, c);
        sketch.add_line(c, d);
        sketch.add_line(d, a);
        solve_in_place(&mut sketch);

        let loops = closed_loops(&sketch).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert!((signed_area(&loops[0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nested_square_becomes_hole() {
        let mut sketch = Sketch::new("s", PlaneId::new());
        add_square(&mut sketch, 0.0, 10.0);
        add_square(&mut sketch, 2.0, 2.0);
        solve_in_place(&mut sketch);

        let regions = extract_regions(&sketch).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].holes.len(), 1);
        assert!(signed_area(&regions[0].holes[0]) < 0.0);
    }

    #[test]
    fn circle_is_its_own_loop() {
        let mut sketch = Sketch::new("c", PlaneId::new());
        let c = sketch.add_point(0.0, 0.0);
        sketch.add_circle(c, 2.0);
        solve_in_place(&mut sketch);

        let loops = closed_loops(&sketch).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), CIRCLE_SEGMENTS);
    }

    #[test]
    fn open_chain_is_a_path_not_a_loop() {
        let mut sketch = Sketch::new("p", PlaneId::new());
        let a = sketch.add_point(0.0, 0.0);
        let b = sketch.add_point(0.0, 5.0);
        let c = sketch.add_point(3.0, 5.0);
        sketch.add_line(a, b);
        sketch.add_line(b, c);
        solve_in_place(&mut sketch);

        assert_eq!(extract_regions(&sketch), Err(ProfileError::NoClosedLoop));
        let path = extract_path(&sketch).unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn unsolved_sketch_has_no_profile() {
        let mut sketch = Sketch::new("u", PlaneId::new());
        add_square(&mut sketch, 0.0, 1.0);
        assert_eq!(extract_regions(&sketch), Err(ProfileError::NotSolved));
    }
}
