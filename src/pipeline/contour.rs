use std::collections::VecDeque;

use crate::types::BoundingBox;

/// Clockwise (in image coordinates, y down) 8-neighbourhood starting at west.
const CLOCKWISE: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

const FOUR_NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Binary image; everything outside the bounds reads as unset.
#[derive(Clone, Debug)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(idx) => self.data[idx],
            None => false,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

/// Closed outer border of one 8-connected blob, in tracing order.
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    /// Area enclosed by the border polygon (shoelace over pixel centres).
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice = 0.0_f64;
        for (i, &(x0, y0)) in self.points.iter().enumerate() {
            let (x1, y1) = self.points[(i + 1) % self.points.len()];
            twice += x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64;
        }
        twice.abs() * 0.5
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (min_x, max_x, min_y, max_y) = self.points.iter().fold(
            (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
            |acc, &(x, y)| (acc.0.min(x), acc.1.max(x), acc.2.min(y), acc.3.max(y)),
        );
        BoundingBox {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1).max(0) as u32,
            height: (max_y - min_y + 1).max(0) as u32,
        }
    }
}

/// Outer borders of every blob not nested inside a hole of another blob,
/// ordered by the raster position of their top-left pixel.
pub fn find_external_contours(mask: &Mask) -> Vec<Contour> {
    let outside = outer_background(mask);
    let mut labelled = vec![false; mask.data.len()];
    let mut contours = Vec::new();

    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            let Some(idx) = mask.index(x, y) else {
                continue;
            };
            if !mask.data[idx] || labelled[idx] {
                continue;
            }

            let pixels = fill_component(mask, (x, y), &mut labelled);
            // The pixel above the first raster hit is background; it belongs to
            // the outer region unless this blob sits inside a hole.
            let external = match mask.index(x, y - 1) {
                None => true,
                Some(above) => outside[above],
            };
            if !external {
                continue;
            }

            contours.push(Contour {
                points: trace_border(mask, (x, y), pixels * 4 + 16),
            });
        }
    }

    contours
}

/// Background reachable from the image edge through 4-connected steps.
fn outer_background(mask: &Mask) -> Vec<bool> {
    let mut outside = vec![false; mask.data.len()];
    let mut queue = VecDeque::new();
    let (w, h) = (mask.width as i32, mask.height as i32);

    let seed = |x: i32, y: i32, outside: &mut Vec<bool>, queue: &mut VecDeque<(i32, i32)>| {
        if let Some(idx) = mask.index(x, y) {
            if !mask.data[idx] && !outside[idx] {
                outside[idx] = true;
                queue.push_back((x, y));
            }
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, h - 1, &mut outside, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        seed(w - 1, y, &mut outside, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in FOUR_NEIGHBOURS {
            seed(x + dx, y + dy, &mut outside, &mut queue);
        }
    }
    outside
}

fn fill_component(mask: &Mask, start: (i32, i32), labelled: &mut [bool]) -> usize {
    let mut stack = vec![start];
    let mut count = 0;
    if let Some(idx) = mask.index(start.0, start.1) {
        labelled[idx] = true;
    }
    while let Some((x, y)) = stack.pop() {
        count += 1;
        for (dx, dy) in CLOCKWISE {
            let (nx, ny) = (x + dx, y + dy);
            if let Some(idx) = mask.index(nx, ny) {
                if mask.data[idx] && !labelled[idx] {
                    labelled[idx] = true;
                    stack.push((nx, ny));
                }
            }
        }
    }
    count
}

/// Moore-neighbour tracing from the top-left pixel of a blob. Stops when the
/// start pixel is about to be left by the same step it was first left by.
fn trace_border(mask: &Mask, start: (i32, i32), max_steps: usize) -> Vec<(i32, i32)> {
    let mut points = vec![start];
    let mut current = start;
    let mut backtrack = (start.0 - 1, start.1);
    let mut first_step: Option<(i32, i32)> = None;

    for _ in 0..max_steps {
        let k = neighbour_index(current, backtrack);
        let mut found = None;
        for i in 1..=8 {
            let (dx, dy) = CLOCKWISE[(k + i) % 8];
            let candidate = (current.0 + dx, current.1 + dy);
            if mask.get(candidate.0, candidate.1) {
                let (bx, by) = CLOCKWISE[(k + i - 1) % 8];
                found = Some((candidate, (current.0 + bx, current.1 + by)));
                break;
            }
        }

        // isolated pixel
        let Some((next, next_backtrack)) = found else {
            break;
        };

        if current == start {
            match first_step {
                None => first_step = Some(next),
                Some(step) if step == next => break,
                Some(_) => {}
            }
        }

        points.push(next);
        current = next;
        backtrack = next_backtrack;
    }

    if points.len() > 1 && points.last() == Some(&start) {
        points.pop();
    }
    points
}

fn neighbour_index(center: (i32, i32), neighbour: (i32, i32)) -> usize {
    let delta = (neighbour.0 - center.0, neighbour.1 - center.1);
    CLOCKWISE.iter().position(|d| *d == delta).unwrap_or(0)
}
