//! Connected-component labeling over binary foreground masks.

use sudoku_scan_core::{GrayImage, GrayImageView};

/// Pixels strictly above this value count as foreground.
pub const FOREGROUND: u8 = 128;

/// Area and axis-aligned bounding box of one labeled component.
#[derive(Clone, Copy, Debug)]
pub struct ComponentStats {
    pub label: u32,
    pub area: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl ComponentStats {
    pub fn bbox_area(&self) -> usize {
        (self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)
    }
}

/// Label 4-connected foreground components with an iterative stack-based
/// flood fill. Label 0 is background; components are numbered from 1.
pub fn label_components(src: &GrayImageView<'_>) -> (Vec<u32>, Vec<ComponentStats>) {
    let (w, h) = (src.width, src.height);
    let mut labels = vec![0u32; w * h];
    let mut stats = Vec::new();
    let mut stack = Vec::new();
    let mut next_label = 1u32;

    for start in 0..w * h {
        if src.data[start] <= FOREGROUND || labels[start] != 0 {
            continue;
        }

        let mut comp = ComponentStats {
            label: next_label,
            area: 0,
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        };

        stack.push(start);
        labels[start] = next_label;

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            comp.area += 1;
            comp.min_x = comp.min_x.min(x);
            comp.min_y = comp.min_y.min(y);
            comp.max_x = comp.max_x.max(x);
            comp.max_y = comp.max_y.max(y);

            let mut visit = |nx: usize, ny: usize| {
                let nidx = ny * w + nx;
                if src.data[nidx] > FOREGROUND && labels[nidx] == 0 {
                    labels[nidx] = next_label;
                    stack.push(nidx);
                }
            };

            if x > 0 {
                visit(x - 1, y);
            }
            if x + 1 < w {
                visit(x + 1, y);
            }
            if y > 0 {
                visit(x, y - 1);
            }
            if y + 1 < h {
                visit(x, y + 1);
            }
        }

        stats.push(comp);
        next_label += 1;
    }

    (labels, stats)
}

/// The component with the largest pixel area, if any.
pub fn largest_component(stats: &[ComponentStats]) -> Option<&ComponentStats> {
    stats.iter().max_by_key(|c| c.area)
}

/// Keep only the largest 4-connected foreground component, zeroing the rest.
///
/// Used to strip grid-line residue from extracted cells; the output has at
/// most one foreground component.
pub fn keep_largest_component(src: &GrayImageView<'_>) -> GrayImage {
    let (labels, stats) = label_components(src);
    let mut out = GrayImage::new(src.width, src.height);

    let Some(winner) = largest_component(&stats) else {
        return out;
    };

    for (i, &label) in labels.iter().enumerate() {
        if label == winner.label {
            out.data[i] = src.data[i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from_rows(rows: &[&[u8]]) -> GrayImage {
        let h = rows.len();
        let w = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        GrayImage::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn labels_two_separate_blobs() {
        let img = image_from_rows(&[
            &[255, 255, 0, 0, 0],
            &[255, 0, 0, 0, 0],
            &[0, 0, 0, 255, 255],
            &[0, 0, 0, 255, 255],
        ]);
        let (_, stats) = label_components(&img.view());
        assert_eq!(stats.len(), 2);
        let winner = largest_component(&stats).unwrap();
        assert_eq!(winner.area, 4);
        assert_eq!((winner.min_x, winner.min_y), (3, 2));
        assert_eq!((winner.max_x, winner.max_y), (4, 3));
    }

    #[test]
    fn diagonal_touch_is_not_connected() {
        let img = image_from_rows(&[&[255, 0], &[0, 255]]);
        let (_, stats) = label_components(&img.view());
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn cleaner_keeps_single_component() {
        let img = image_from_rows(&[
            &[255, 255, 255, 0, 200],
            &[255, 255, 255, 0, 0],
            &[0, 0, 0, 0, 200],
        ]);
        let cleaned = keep_largest_component(&img.view());
        let (_, stats) = label_components(&cleaned.view());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].area, 6);
        assert_eq!(cleaned.at(4, 0), 0);
    }

    #[test]
    fn cleaner_on_blank_input_stays_blank() {
        let img = GrayImage::new(4, 4);
        let cleaned = keep_largest_component(&img.view());
        assert!(cleaned.data.iter().all(|&v| v == 0));
    }
}
