//! Config labels attached to header cells.
//!
//! Labels are plain strings; styling code looks them up to decide how a cell
//! is painted. The header always contributes its own region and state labels,
//! callers can append more through a [`ConfigLabelAccumulator`].

/// Region label of a merged group cell.
pub const ROW_GROUP_HEADER: &str = "ROW_GROUP_HEADER";

/// Region label of a plain row header cell.
pub const ROW_HEADER: &str = "ROW_HEADER";

/// State label of a group that is expanded.
pub const GROUP_EXPANDED_CONFIG_TYPE: &str = "GROUP_EXPANDED";

/// State label of a group that is collapsed.
pub const GROUP_COLLAPSED_CONFIG_TYPE: &str = "GROUP_COLLAPSED";

/// Ordered set of labels. Earlier labels win when styles conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStack {
    labels: Vec<String>,
}

impl LabelStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label unless it is already present
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.has_label(&label) {
            self.labels.push(label);
        }
    }

    /// Put a label in front of all others, moving it if already present
    pub fn add_label_on_top(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.labels.retain(|l| *l != label);
        self.labels.insert(0, label);
    }

    pub fn remove_label(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != label);
        self.labels.len() != before
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Hook that appends extra labels for a cell position.
pub trait ConfigLabelAccumulator {
    fn accumulate_config_labels(&self, labels: &mut LabelStack, column: usize, row: usize);
}

impl<F> ConfigLabelAccumulator for F
where
    F: Fn(&mut LabelStack, usize, usize),
{
    fn accumulate_config_labels(&self, labels: &mut LabelStack, column: usize, row: usize) {
        self(labels, column, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_stack_ordering() {
        let mut stack = LabelStack::new();
        stack.add_label(ROW_GROUP_HEADER);
        stack.add_label(GROUP_EXPANDED_CONFIG_TYPE);
        stack.add_label(ROW_GROUP_HEADER);
        assert_eq!(stack.len(), 2);

        stack.add_label_on_top(GROUP_EXPANDED_CONFIG_TYPE);
        assert_eq!(stack.labels()[0], GROUP_EXPANDED_CONFIG_TYPE);
        assert_eq!(stack.labels()[1], ROW_GROUP_HEADER);

        assert!(stack.remove_label(ROW_GROUP_HEADER));
        assert!(!stack.remove_label(ROW_GROUP_HEADER));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_closure_accumulator() {
        let accumulator = |labels: &mut LabelStack, _col: usize, row: usize| {
            if row % 2 == 0 {
                labels.add_label("EVEN");
            }
        };
        let mut stack = LabelStack::new();
        accumulator.accumulate_config_labels(&mut stack, 0, 2);
        accumulator.accumulate_config_labels(&mut stack, 0, 3);
        assert_eq!(stack.labels(), &["EVEN".to_string()]);
    }
}
