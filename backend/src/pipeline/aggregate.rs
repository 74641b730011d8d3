use crate::pipeline::spreadsheet::RawRow;
use common::model::student::StudentRecord;

const NAME_COLUMN: usize = 0;
const ROLL_NUMBER_COLUMN: usize = 1;
const CLASS_COLUMN: usize = 2;

/// Builds a `StudentRecord` from one row and the contact found for it.
///
/// Subjects are every column from `subject_column_start` onward, taken in
/// column order; marks follow the same order. The reader has already
/// rejected non-numeric subject cells.
pub fn aggregate(
    row: &RawRow,
    contact_address: Option<String>,
    subject_column_start: usize,
) -> StudentRecord {
    let text = |index: usize| row.cell(index).map(|c| c.to_string()).unwrap_or_default();

    let (subjects, marks): (Vec<String>, Vec<f64>) = row
        .cells
        .iter()
        .skip(subject_column_start)
        .map(|(title, cell)| (title.clone(), cell.as_number().unwrap_or_default()))
        .unzip();
    let total_marks = marks.iter().sum();

    StudentRecord {
        name: text(NAME_COLUMN),
        roll_number: text(ROLL_NUMBER_COLUMN),
        class_name: text(CLASS_COLUMN),
        subjects,
        marks,
        total_marks,
        contact_address,
    }
}

/// The student name of a row, used for the contact lookup.
pub fn student_name(row: &RawRow) -> String {
    row.cell(NAME_COLUMN).map(|c| c.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::spreadsheet::Cell;

    fn row(subjects: &[(&str, f64)]) -> RawRow {
        let mut cells = vec![
            ("Student Name".to_string(), Cell::Text("Jane Doe".into())),
            ("Roll Number".to_string(), Cell::Number(12.0)),
            ("Class".to_string(), Cell::Text("III AI&DS".into())),
        ];
        cells.extend(
            subjects
                .iter()
                .map(|(title, mark)| (title.to_string(), Cell::Number(*mark))),
        );
        RawRow { cells }
    }

    #[test]
    fn total_is_the_sum_of_marks() {
        let record = aggregate(
            &row(&[("Maths", 90.0), ("Physics", 85.0), ("Chemistry", 78.0)]),
            Some("+911234567890".into()),
            3,
        );
        assert_eq!(record.total_marks, 253.0);
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.roll_number, "12");
        assert_eq!(record.class_name, "III AI&DS");
    }

    #[test]
    fn subjects_and_marks_move_in_lockstep() {
        let forward = aggregate(&row(&[("Maths", 90.0), ("Physics", 85.0)]), None, 3);
        let swapped = aggregate(&row(&[("Physics", 85.0), ("Maths", 90.0)]), None, 3);

        assert_eq!(forward.subjects, ["Maths", "Physics"]);
        assert_eq!(forward.marks, [90.0, 85.0]);
        assert_eq!(swapped.subjects, ["Physics", "Maths"]);
        assert_eq!(swapped.marks, [85.0, 90.0]);
        assert_eq!(forward.subjects.len(), forward.marks.len());
        assert_eq!(forward.total_marks, swapped.total_marks);
    }

    #[test]
    fn missing_contact_is_kept_on_the_record() {
        let record = aggregate(&row(&[("Maths", 40.0)]), None, 3);
        assert_eq!(record.contact_address, None);
        assert_eq!(record.subjects.len(), 1);
    }

    #[test]
    fn subject_start_is_configurable() {
        let record = aggregate(&row(&[("Section", 1.0), ("Maths", 90.0)]), None, 4);
        assert_eq!(record.subjects, ["Maths"]);
        assert_eq!(record.total_marks, 90.0);
    }
}
