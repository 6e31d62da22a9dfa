//! Bounded-radius light propagation over a grid.
//!
//! Each source floods outward breadth-first over 4-neighbours. A cell is lit
//! when its Euclidean distance to the source cell is within the radius. Opaque
//! cells are lit but never spread light further, except when the source sits
//! on one. Per-cell contributions are combined with [`Blend`] on top of the
//! ambient level and clamped to `[0, 1]`.

use std::collections::VecDeque;

use gloam_ecs::component::Cell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    /// `1 - t`
    #[default]
    Linear,
    /// `(1 - t)^2`
    Quadratic,
}

impl Falloff {
    /// Intensity at normalized distance `t = d / radius`.
    pub fn intensity(self, t: f32) -> f32 {
        let k = (1.0 - t).max(0.0);
        match self {
            Falloff::Linear => k,
            Falloff::Quadratic => k * k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blend {
    /// Brightest contribution wins.
    #[default]
    Max,
    /// Contributions add up.
    Additive,
}

/// Lighting parameters shared by every layer of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Light level of a cell no source reaches.
    pub ambient: f32,
    pub falloff: Falloff,
    pub blend: Blend,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient: 0.0,
            falloff: Falloff::Linear,
            blend: Blend::Max,
        }
    }
}

/// A light as seen by the propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSource {
    pub cell: Cell,
    pub radius: u32,
}

const NEIGHBOURS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];

/// Compute the light field of a `width x height` layer, row-major.
///
/// Sources outside the grid contribute nothing. A radius of zero lights only
/// the source cell.
pub fn compute_field(
    width: u32,
    height: u32,
    is_opaque: impl Fn(i32, i32) -> bool,
    sources: &[LightSource],
    config: &LightConfig,
) -> Vec<f32> {
    let (w, h) = (width as i32, height as i32);
    let cells = width as usize * height as usize;
    let mut field = vec![config.ambient; cells];
    let mut visited = vec![false; cells];
    let mut queue = VecDeque::new();

    let index = |x: i32, y: i32| y as usize * width as usize + x as usize;
    let in_bounds = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h;

    for source in sources {
        let Cell { x: sx, y: sy } = source.cell;
        if !in_bounds(sx, sy) {
            continue;
        }
        visited.iter_mut().for_each(|v| *v = false);
        queue.clear();

        visited[index(sx, sy)] = true;
        queue.push_back((sx, sy));

        while let Some((x, y)) = queue.pop_front() {
            let idx = index(x, y);
            let value = if source.radius == 0 {
                1.0
            } else {
                let d = (((x - sx).pow(2) + (y - sy).pow(2)) as f32).sqrt();
                config.falloff.intensity(d / source.radius as f32)
            };
            field[idx] = match config.blend {
                Blend::Max => field[idx].max(value),
                Blend::Additive => field[idx] + value,
            };

            if is_opaque(x, y) && (x, y) != (sx, sy) {
                continue;
            }
            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x + dx, y + dy);
                if !in_bounds(nx, ny) || visited[index(nx, ny)] {
                    continue;
                }
                let dist_sq = (nx - sx).pow(2) + (ny - sy).pow(2);
                if dist_sq as u64 > u64::from(source.radius).pow(2) {
                    continue;
                }
                visited[index(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    for value in &mut field {
        *value = value.clamp(0.0, 1.0);
    }
    field
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn open(_: i32, _: i32) -> bool {
        false
    }

    fn at(field: &[f32], width: u32, x: i32, y: i32) -> f32 {
        field[y as usize * width as usize + x as usize]
    }

    #[test]
    fn intensity_falls_off_with_distance() {
        let src = [LightSource {
            cell: Cell::new(0, 0),
            radius: 4,
        }];
        let field = compute_field(6, 1, open, &src, &LightConfig::default());
        assert_eq!(at(&field, 6, 0, 0), 1.0);
        assert!((at(&field, 6, 2, 0) - 0.5).abs() < 1e-6);
        assert_eq!(at(&field, 6, 4, 0), 0.0);
        assert_eq!(at(&field, 6, 5, 0), 0.0);
    }

    #[test]
    fn quadratic_is_dimmer_than_linear() {
        let src = [LightSource {
            cell: Cell::new(0, 0),
            radius: 4,
        }];
        let quad = LightConfig {
            falloff: Falloff::Quadratic,
            ..LightConfig::default()
        };
        let field = compute_field(4, 1, open, &src, &quad);
        assert!((at(&field, 4, 2, 0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn opaque_cells_are_lit_but_block_spread() {
        // Source at x=0, wall at x=2.
        let wall = |x: i32, _y: i32| x == 2;
        let src = [LightSource {
            cell: Cell::new(0, 0),
            radius: 8,
        }];
        let field = compute_field(5, 1, wall, &src, &LightConfig::default());
        assert!(at(&field, 5, 2, 0) > 0.0);
        assert_eq!(at(&field, 5, 3, 0), 0.0);
    }

    #[test]
    fn light_bends_around_a_short_wall() {
        // . . . . .
        // S # . . .
        // . . . . .
        let wall = |x: i32, y: i32| x == 1 && y == 1;
        let src = [LightSource {
            cell: Cell::new(0, 1),
            radius: 4,
        }];
        let field = compute_field(5, 3, wall, &src, &LightConfig::default());
        assert!(at(&field, 5, 2, 1) > 0.0, "reached via the row above");
    }

    #[test]
    fn max_and_additive_blend() {
        let sources = [
            LightSource {
                cell: Cell::new(0, 0),
                radius: 2,
            },
            LightSource {
                cell: Cell::new(2, 0),
                radius: 2,
            },
        ];
        let max = compute_field(3, 1, open, &sources, &LightConfig::default());
        assert!((at(&max, 3, 1, 0) - 0.5).abs() < 1e-6);

        let add = LightConfig {
            blend: Blend::Additive,
            ..LightConfig::default()
        };
        let sum = compute_field(3, 1, open, &sources, &add);
        assert!((at(&sum, 3, 1, 0) - 1.0).abs() < 1e-6);
        assert_eq!(at(&sum, 3, 0, 0), 1.0, "clamped");
    }

    #[test]
    fn ambient_is_the_floor() {
        let cfg = LightConfig {
            ambient: 0.2,
            ..LightConfig::default()
        };
        let field = compute_field(3, 3, open, &[], &cfg);
        assert!(field.iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn zero_radius_lights_only_its_cell() {
        let src = [LightSource {
            cell: Cell::new(1, 1),
            radius: 0,
        }];
        let field = compute_field(3, 3, open, &src, &LightConfig::default());
        assert_eq!(field.iter().filter(|&&v| v > 0.0).count(), 1);
        assert_eq!(at(&field, 3, 1, 1), 1.0);
    }

    #[test]
    fn source_outside_grid_is_ignored() {
        let src = [LightSource {
            cell: Cell::new(-5, 0),
            radius: 10,
        }];
        let field = compute_field(3, 1, open, &src, &LightConfig::default());
        assert!(field.iter().all(|&v| v == 0.0));
    }
}
