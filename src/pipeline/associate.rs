//! Checkbox-to-label association by nearest-neighbour geometry.
//!
//! The layout service reports checkboxes (selection marks) and text lines
//! independently; nothing in its output says which label a checkbox belongs
//! to. On a W-9 the label is simply the closest text: the distance from the
//! checkbox's polygon centre to each line's first vertex decides.
//!
//! Pure function of its two inputs — no I/O, no ordering changes. The line
//! list keeps the service's reading order; only the association list is
//! derived here.

use crate::pipeline::layout::{SelectionMark, SelectionState, TextLine};

/// A checkbox paired with its nearest text label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxAssociation {
    pub label: String,
    pub state: SelectionState,
}

/// Pair every geometric selection mark with its nearest text line.
///
/// - Marks without geometry are skipped entirely (no association emitted).
/// - Lines without geometry are never candidates.
/// - With zero eligible lines the label is the empty string.
/// - Ties go to the first line encountered (strict `<` comparison).
pub fn associate_checkboxes(
    lines: &[TextLine],
    marks: &[SelectionMark],
) -> Vec<CheckboxAssociation> {
    marks
        .iter()
        .filter_map(|mark| {
            let center = polygon_center(&mark.polygon)?;
            Some(CheckboxAssociation {
                label: nearest_line_content(lines, center),
                state: mark.state,
            })
        })
        .collect()
}

/// Arithmetic mean of the x and y coordinates of a flat polygon.
///
/// Returns `None` for a polygon with fewer than one (x, y) pair.
fn polygon_center(polygon: &[f64]) -> Option<(f64, f64)> {
    let xs: Vec<f64> = polygon.iter().copied().step_by(2).collect();
    let ys: Vec<f64> = polygon.iter().copied().skip(1).step_by(2).collect();
    if xs.is_empty() || ys.is_empty() {
        return None;
    }
    Some((
        xs.iter().sum::<f64>() / xs.len() as f64,
        ys.iter().sum::<f64>() / ys.len() as f64,
    ))
}

/// Content of the line whose first vertex is closest to `center`.
fn nearest_line_content(lines: &[TextLine], center: (f64, f64)) -> String {
    let mut nearest = String::new();
    let mut min_dist = f64::INFINITY;
    for line in lines {
        let &[lx, ly, ..] = line.polygon.as_slice() else {
            continue;
        };
        let dist = ((lx - center.0).powi(2) + (ly - center.1).powi(2)).sqrt();
        if dist < min_dist {
            min_dist = dist;
            nearest = line.content.clone();
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(content: &str, polygon: &[f64]) -> TextLine {
        TextLine {
            content: content.to_string(),
            polygon: polygon.to_vec(),
        }
    }

    fn mark(polygon: &[f64], state: SelectionState) -> SelectionMark {
        SelectionMark {
            polygon: polygon.to_vec(),
            state,
        }
    }

    #[test]
    fn center_on_first_vertex_beats_every_other_line() {
        let lines = vec![
            line("Individual", &[1.0, 1.0, 3.0, 1.0]),
            line("C Corporation", &[5.0, 5.0, 7.0, 5.0]),
        ];
        // Square centred exactly on (5, 5), the second line's first vertex.
        let marks = vec![mark(&[4.9, 4.9, 5.1, 4.9, 5.1, 5.1, 4.9, 5.1], SelectionState::Selected)];

        let assoc = associate_checkboxes(&lines, &marks);
        assert_eq!(assoc.len(), 1);
        assert_eq!(assoc[0].label, "C Corporation");
        assert_eq!(assoc[0].state, SelectionState::Selected);
    }

    #[test]
    fn no_eligible_lines_yields_empty_label() {
        let lines = vec![line("ghost", &[])];
        let marks = vec![mark(&[1.0, 1.0, 2.0, 2.0], SelectionState::Unselected)];

        let assoc = associate_checkboxes(&lines, &marks);
        assert_eq!(assoc.len(), 1);
        assert_eq!(assoc[0].label, "");
    }

    #[test]
    fn markless_checkbox_yields_no_association() {
        let lines = vec![line("Individual", &[1.0, 1.0])];
        let marks = vec![
            mark(&[], SelectionState::Selected),
            mark(&[1.0, 1.0, 1.2, 1.2], SelectionState::Unselected),
        ];

        let assoc = associate_checkboxes(&lines, &marks);
        assert_eq!(assoc.len(), 1);
        assert_eq!(assoc[0].state, SelectionState::Unselected);
    }

    #[test]
    fn geometry_free_lines_are_never_candidates() {
        let lines = vec![
            line("no geometry", &[]),
            line("far but real", &[100.0, 100.0]),
        ];
        let marks = vec![mark(&[0.0, 0.0, 1.0, 1.0], SelectionState::Selected)];

        let assoc = associate_checkboxes(&lines, &marks);
        assert_eq!(assoc[0].label, "far but real");
    }

    #[test]
    fn tie_goes_to_first_line() {
        let lines = vec![
            line("first", &[0.0, 2.0]),
            line("second", &[0.0, -2.0]),
        ];
        // Centre (0, 0) is equidistant from both first vertices.
        let marks = vec![mark(&[-1.0, -1.0, 1.0, 1.0], SelectionState::Selected)];

        let assoc = associate_checkboxes(&lines, &marks);
        assert_eq!(assoc[0].label, "first");
    }

    #[test]
    fn polygon_center_is_coordinate_mean() {
        assert_eq!(polygon_center(&[0.0, 0.0, 2.0, 0.0, 2.0, 2.0, 0.0, 2.0]), Some((1.0, 1.0)));
        assert_eq!(polygon_center(&[]), None);
    }
}
