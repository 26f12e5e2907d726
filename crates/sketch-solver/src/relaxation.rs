//! Damped least-squares (Levenberg-Marquardt) sketch solver.
//!
//! Every point contributes two unknowns and every circle one (its radius).
//! Constraints compile to scalar residuals; the solver minimizes their sum of
//! squares starting from the drawn coordinates, then classifies the result
//! from the rank of the residual Jacobian.

use std::collections::BTreeMap;

use history_types::{Constraint, ElementId, Primitive, Sketch, SolveStatus, Vec2};
use nalgebra::{DMatrix, DVector, SVD};
use serde::{Deserialize, Serialize};

use crate::traits::SketchSolver;
use crate::types::{SolveError, SolveOutput};

/// Configuration for the relaxation solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Converged when the sum of squared residuals falls below this.
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
    /// Singular values below this fraction of the largest count as zero.
    pub rank_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-14,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
            rank_tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Default)]
pub struct RelaxationSolver {
    config: SolverConfig,
}

impl RelaxationSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// A scalar quantity measured on the unknown vector.
#[derive(Debug, Clone, Copy)]
enum Measure {
    Var(usize),
    /// Distance between the points whose x unknowns sit at these indices.
    Len(usize, usize),
}

#[derive(Debug, Clone, Copy)]
enum Term {
    Value { m: Measure, value: f64 },
    Equal { a: Measure, b: Measure },
    PointLine { p: usize, s: usize, e: usize, value: f64 },
    Parallel { a: (usize, usize), b: (usize, usize) },
    Perpendicular { a: (usize, usize), b: (usize, usize) },
}

fn measure(m: Measure, v: &[f64]) -> f64 {
    match m {
        Measure::Var(i) => v[i],
        Measure::Len(p, q) => (v[p] - v[q]).hypot(v[p + 1] - v[q + 1]),
    }
}

fn direction(line: (usize, usize), v: &[f64]) -> (f64, f64) {
    (v[line.1] - v[line.0], v[line.1 + 1] - v[line.0 + 1])
}

impl Term {
    fn eval(&self, v: &[f64]) -> f64 {
        match *self {
            Term::Value { m, value } => measure(m, v) - value,
            Term::Equal { a, b } => measure(a, v) - measure(b, v),
            Term::PointLine { p, s, e, value } => {
                let (dx, dy) = direction((s, e), v);
                let len = dx.hypot(dy).max(1e-12);
                let signed = (dx * (v[p + 1] - v[s + 1]) - dy * (v[p] - v[s])) / len;
                if value == 0.0 {
                    signed
                } else {
                    signed.abs() - value
                }
            }
            Term::Parallel { a, b } | Term::Perpendicular { a, b } => {
                let (ax, ay) = direction(a, v);
                let (bx, by) = direction(b, v);
                let norm = (ax.hypot(ay) * bx.hypot(by)).max(1e-12);
                if matches!(self, Term::Parallel { .. }) {
                    (ax * by - ay * bx) / norm
                } else {
                    (ax * bx + ay * by) / norm
                }
            }
        }
    }
}

/// Unknown vector layout and compiled residuals for one sketch.
struct System {
    points: BTreeMap<ElementId, usize>,
    radii: BTreeMap<ElementId, usize>,
    initial: Vec<f64>,
    terms: Vec<Term>,
}

impl System {
    fn build(sketch: &Sketch) -> Result<Self, SolveError> {
        let mut points = BTreeMap::new();
        let mut radii = BTreeMap::new();
        let mut initial = Vec::new();
        for (id, primitive) in &sketch.primitives {
            if let Primitive::Point { x, y } = primitive {
                points.insert(*id, initial.len());
                initial.extend([*x, *y]);
            }
        }
        for (id, primitive) in &sketch.primitives {
            if let Primitive::Circle { radius, .. } = primitive {
                radii.insert(*id, initial.len());
                initial.push(*radius);
            }
        }

        let mut system = Self {
            points,
            radii,
            initial,
            terms: Vec::new(),
        };

        for (id, primitive) in &sketch.primitives {
            match primitive {
                Primitive::Point { .. } => {}
                Primitive::Line { start, end } => {
                    system.point(sketch, *id, *start)?;
                    system.point(sketch, *id, *end)?;
                }
                Primitive::Circle { center, .. } => {
                    system.point(sketch, *id, *center)?;
                }
                Primitive::Arc { center, start, end } => {
                    let c = system.point(sketch, *id, *center)?;
                    let s = system.point(sketch, *id, *start)?;
                    let e = system.point(sketch, *id, *end)?;
                    // Both arc ends lie on the same circle.
                    system.terms.push(Term::Equal {
                        a: Measure::Len(c, s),
                        b: Measure::Len(c, e),
                    });
                }
            }
        }

        for (id, constraint) in &sketch.constraints {
            system.compile(sketch, *id, constraint)?;
        }
        Ok(system)
    }

    fn point(&self, sketch: &Sketch, owner: ElementId, element: ElementId) -> Result<usize, SolveError> {
        match sketch.primitives.get(&element) {
            None => Err(SolveError::MissingElement { owner, element }),
            Some(Primitive::Point { .. }) => Ok(self.points[&element]),
            Some(_) => Err(SolveError::WrongPrimitive {
                owner,
                element,
                expected: "point",
            }),
        }
    }

    fn line(&self, sketch: &Sketch, owner: ElementId, element: ElementId) -> Result<(usize, usize), SolveError> {
        match sketch.primitives.get(&element) {
            None => Err(SolveError::MissingElement { owner, element }),
            Some(Primitive::Line { start, end }) => {
                Ok((self.point(sketch, element, *start)?, self.point(sketch, element, *end)?))
            }
            Some(_) => Err(SolveError::WrongPrimitive {
                owner,
                element,
                expected: "line",
            }),
        }
    }

    /// Radius of a circle or arc as a measure.
    fn radius(&self, sketch: &Sketch, owner: ElementId, element: ElementId) -> Result<Measure, SolveError> {
        match sketch.primitives.get(&element) {
            None => Err(SolveError::MissingElement { owner, element }),
            Some(Primitive::Circle { .. }) => Ok(Measure::Var(self.radii[&element])),
            Some(Primitive::Arc { center, start, .. }) => Ok(Measure::Len(
                self.point(sketch, element, *center)?,
                self.point(sketch, element, *start)?,
            )),
            Some(_) => Err(SolveError::WrongPrimitive {
                owner,
                element,
                expected: "circle or arc",
            }),
        }
    }

    fn is_line(sketch: &Sketch, element: ElementId) -> bool {
        matches!(sketch.primitives.get(&element), Some(Primitive::Line { .. }))
    }

    fn compile(&mut self, sketch: &Sketch, id: ElementId, constraint: &Constraint) -> Result<(), SolveError> {
        match *constraint {
            Constraint::Fixed { point, x, y } => {
                let p = self.point(sketch, id, point)?;
                self.terms.push(Term::Value { m: Measure::Var(p), value: x });
                self.terms.push(Term::Value { m: Measure::Var(p + 1), value: y });
            }
            Constraint::Coincident { a, b } => {
                let (pa, pb) = (self.point(sketch, id, a)?, self.point(sketch, id, b)?);
                self.terms.push(Term::Equal { a: Measure::Var(pa), b: Measure::Var(pb) });
                self.terms.push(Term::Equal { a: Measure::Var(pa + 1), b: Measure::Var(pb + 1) });
            }
            Constraint::Horizontal { line } => {
                let (s, e) = self.line(sketch, id, line)?;
                self.terms.push(Term::Equal { a: Measure::Var(s + 1), b: Measure::Var(e + 1) });
            }
            Constraint::Vertical { line } => {
                let (s, e) = self.line(sketch, id, line)?;
                self.terms.push(Term::Equal { a: Measure::Var(s), b: Measure::Var(e) });
            }
            Constraint::Distance { a, b, value } => {
                let term = if Self::is_line(sketch, b) {
                    let (s, e) = self.line(sketch, id, b)?;
                    Term::PointLine { p: self.point(sketch, id, a)?, s, e, value }
                } else if Self::is_line(sketch, a) {
                    let (s, e) = self.line(sketch, id, a)?;
                    Term::PointLine { p: self.point(sketch, id, b)?, s, e, value }
                } else {
                    let (pa, pb) = (self.point(sketch, id, a)?, self.point(sketch, id, b)?);
                    Term::Value { m: Measure::Len(pa, pb), value }
                };
                self.terms.push(term);
            }
            Constraint::Radius { circle, value } => {
                let m = self.radius(sketch, id, circle)?;
                self.terms.push(Term::Value { m, value });
            }
            Constraint::Parallel { a, b } => {
                let (la, lb) = (self.line(sketch, id, a)?, self.line(sketch, id, b)?);
                self.terms.push(Term::Parallel { a: la, b: lb });
            }
            Constraint::Perpendicular { a, b } => {
                let (la, lb) = (self.line(sketch, id, a)?, self.line(sketch, id, b)?);
                self.terms.push(Term::Perpendicular { a: la, b: lb });
            }
            Constraint::Equal { a, b } => {
                let term = if Self::is_line(sketch, a) {
                    let (la, lb) = (self.line(sketch, id, a)?, self.line(sketch, id, b)?);
                    Term::Equal {
                        a: Measure::Len(la.0, la.1),
                        b: Measure::Len(lb.0, lb.1),
                    }
                } else {
                    Term::Equal {
                        a: self.radius(sketch, id, a)?,
                        b: self.radius(sketch, id, b)?,
                    }
                };
                self.terms.push(term);
            }
        }
        Ok(())
    }

    fn residuals(&self, v: &[f64]) -> DVector<f64> {
        DVector::from_iterator(self.terms.len(), self.terms.iter().map(|t| t.eval(v)))
    }

    fn cost(&self, v: &[f64]) -> f64 {
        self.terms.iter().map(|t| t.eval(v).powi(2)).sum()
    }

    /// Central-difference Jacobian, one row per residual.
    fn jacobian(&self, v: &[f64]) -> DMatrix<f64> {
        let n = v.len();
        let mut jac = DMatrix::zeros(self.terms.len(), n);
        let mut shifted = v.to_vec();
        for j in 0..n {
            let h = 1e-7 * v[j].abs().max(1.0);
            shifted[j] = v[j] + h;
            let plus = self.residuals(&shifted);
            shifted[j] = v[j] - h;
            let minus = self.residuals(&shifted);
            shifted[j] = v[j];
            jac.set_column(j, &((plus - minus) / (2.0 * h)));
        }
        jac
    }
}

/// Numerical rank from the singular values, relative to the largest one.
fn rank(jac: DMatrix<f64>, tolerance: f64) -> usize {
    let svd = SVD::new(jac, false, false);
    let sv = &svd.singular_values;
    let max_sv = sv.iter().copied().fold(0.0_f64, f64::max).max(1.0);
    let threshold = tolerance * max_sv;
    sv.iter().filter(|&&s| s > threshold).count()
}

impl SketchSolver for RelaxationSolver {
    fn solve(&mut self, sketch: &Sketch) -> Result<SolveOutput, SolveError> {
        let system = System::build(sketch)?;
        let config = &self.config;
        let n = system.initial.len();
        let mut v = system.initial.clone();
        let mut cost = system.cost(&v);
        let mut lambda = config.lambda_initial;
        let mut iterations = 0;

        while cost >= config.tolerance && iterations < config.max_iterations {
            iterations += 1;
            let r = system.residuals(&v);
            let j = system.jacobian(&v);

            // Normal equations JᵀJ δ = -Jᵀr.
            let jt = j.transpose();
            let jtj = &jt * &j;
            let jtr = -(&jt * &r);

            let mut improved = false;
            for _ in 0..12 {
                let damped = &jtj + DMatrix::identity(n, n) * lambda;
                let Some(step) = damped.lu().solve(&jtr) else {
                    lambda *= config.lambda_factor;
                    continue;
                };
                let candidate: Vec<f64> = v.iter().zip(step.iter()).map(|(a, d)| a + d).collect();
                let candidate_cost = system.cost(&candidate);
                if candidate_cost < cost {
                    v = candidate;
                    cost = candidate_cost;
                    lambda = (lambda / config.lambda_factor).max(1e-12);
                    improved = true;
                    break;
                }
                lambda *= config.lambda_factor;
            }
            if !improved {
                break;
            }
        }

        let equations = system.terms.len();
        let rank = if equations == 0 {
            0
        } else {
            rank(system.jacobian(&v), config.rank_tolerance)
        };
        let dof = (n - rank.min(n)) as u32;
        let status = if cost >= config.tolerance {
            SolveStatus::Inconsistent
        } else if equations > rank {
            SolveStatus::OverConstrained
        } else if dof == 0 {
            SolveStatus::FullyConstrained
        } else {
            SolveStatus::UnderConstrained
        };
        tracing::debug!(
            sketch = %sketch.id,
            iterations,
            residual = cost,
            equations,
            dof,
            ?status,
            "sketch solved"
        );

        Ok(SolveOutput {
            positions: system
                .points
                .iter()
                .map(|(id, &i)| (*id, Vec2::new(v[i], v[i + 1])))
                .collect(),
            radii: system.radii.iter().map(|(id, &i)| (*id, v[i])).collect(),
            status,
            dof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use history_types::PlaneId;

    fn solve(sketch: &Sketch) -> SolveOutput {
        RelaxationSolver::default().solve(sketch).unwrap()
    }

    #[test]
    fn horizontal_line_moves_free_end() {
        let mut sketch = Sketch::new("h", PlaneId::new());
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 5.0);
        let line = sketch.add_line(p1, p2);
        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Horizontal { line });

        let out = solve(&sketch);
        assert_eq!(out.status, SolveStatus::UnderConstrained);
        assert_eq!(out.dof, 1);
        assert_relative_eq!(out.positions[&p2].y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn distance_is_reached() {
        let mut sketch = Sketch::new("d", PlaneId::new());
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 4.0);
        sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Distance { a: p1, b: p2, value: 10.0 });

        let out = solve(&sketch);
        assert_relative_eq!(out.positions[&p1].distance(out.positions[&p2]), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn circle_radius_is_solved() {
        let mut sketch = Sketch::new("c", PlaneId::new());
        let c = sketch.add_point(0.0, 0.0);
        let circle = sketch.add_circle(c, 1.0);
        sketch.add_constraint(Constraint::Fixed { point: c, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Radius { circle, value: 4.0 });

        let out = solve(&sketch);
        assert_eq!(out.status, SolveStatus::FullyConstrained);
        assert_relative_eq!(out.radii[&circle], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn contradicting_fixes_are_inconsistent() {
        let mut sketch = Sketch::new("x", PlaneId::new());
        let p = sketch.add_point(0.0, 0.0);
        sketch.add_constraint(Constraint::Fixed { point: p, x: 0.0, y: 0.0 });
        sketch.add_constraint(Constraint::Fixed { point: p, x: 1.0, y: 0.0 });
        assert_eq!(solve(&sketch).status, SolveStatus::Inconsistent);
    }

    #[test]
    fn duplicated_constraint_is_over_constrained() {
        let mut sketch = Sketch::new("o", PlaneId::new());
        let p = sketch.add_point(2.0, 3.0);
        sketch.add_constraint(Constraint::Fixed { point: p, x: 2.0, y: 3.0 });
        sketch.add_constraint(Constraint::Fixed { point: p, x: 2.0, y: 3.0 });
        assert_eq!(solve(&sketch).status, SolveStatus::OverConstrained);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let mut sketch = Sketch::new("m", PlaneId::new());
        sketch.add_constraint(Constraint::Horizontal { line: 42 });
        let err = RelaxationSolver::default().solve(&sketch).unwrap_err();
        assert!(matches!(err, SolveError::MissingElement { element: 42, .. }));
    }

    #[test]
    fn rank_of_dependent_rows() {
        let rows = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 0.0, 1.0]);
        assert_eq!(rank(rows, 1e-9), 2);
    }
}
