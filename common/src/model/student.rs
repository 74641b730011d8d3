use serde::{Deserialize, Serialize};

/// One student's marks, derived from a spreadsheet row plus the contact
/// address found for that student.
///
/// `subjects` and `marks` are index-aligned and always have the same length.
/// Records without a `contact_address` are built and logged but never reach
/// rendering, publishing or notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    /// Roll number in its display form (`12`, not `12.0`).
    pub roll_number: String,
    pub class_name: String,
    /// Subject labels in sheet column order.
    pub subjects: Vec<String>,
    pub marks: Vec<f64>,
    /// Arithmetic sum of `marks`.
    pub total_marks: f64,
    pub contact_address: Option<String>,
}

impl StudentRecord {
    /// Iterates `(subject, mark)` pairs in column order.
    pub fn subject_marks(&self) -> impl Iterator<Item = (&str, f64)> {
        self.subjects
            .iter()
            .map(String::as_str)
            .zip(self.marks.iter().copied())
    }
}
