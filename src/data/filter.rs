use std::collections::BTreeSet;

use crate::solver::DensityReport;

// ---------------------------------------------------------------------------
// Channel selection: which channels are shown in plots and tables
// ---------------------------------------------------------------------------

/// Names of the channels currently shown.  Selection only affects
/// presentation; the solver always sees every channel.
pub type ChannelSelection = BTreeSet<String>;

/// Initialise a [`ChannelSelection`] with every active channel selected.
pub fn init_selection(report: &DensityReport) -> ChannelSelection {
    report.active_channels.iter().cloned().collect()
}

/// Keep the user's choices across a re-solve: channels still active stay as
/// they were, newly active channels start selected.
pub fn carry_selection(
    previous: &ChannelSelection,
    old_active: &[String],
    report: &DensityReport,
) -> ChannelSelection {
    report
        .active_channels
        .iter()
        .filter(|name| previous.contains(*name) || !old_active.contains(*name))
        .cloned()
        .collect()
}

/// Active channel names that pass the selection, in channel order.
pub fn visible_channels<'a>(report: &'a DensityReport, selection: &ChannelSelection) -> Vec<&'a str> {
    report
        .active_channels
        .iter()
        .filter(|name| selection.contains(*name))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ChannelCurve, Sample};
    use crate::solver::{SolverConfig, solve};

    fn report(names: &[&str]) -> DensityReport {
        let samples = vec![Sample::new(0.0, 95.0), Sample::new(100.0, 20.0)];
        let channels: Vec<ChannelCurve> = names.iter().map(|n| ChannelCurve::new(*n, vec![1.0, 1.0])).collect();
        solve(&samples, &channels, &SolverConfig::default())
    }

    #[test]
    fn everything_starts_selected() {
        let r = report(&["K", "C", "LK"]);
        let selection = init_selection(&r);
        assert_eq!(visible_channels(&r, &selection), vec!["K", "C", "LK"]);
    }

    #[test]
    fn deselected_channels_are_hidden_in_order() {
        let r = report(&["K", "C", "LK"]);
        let mut selection = init_selection(&r);
        selection.remove("C");
        assert_eq!(visible_channels(&r, &selection), vec!["K", "LK"]);
        selection.clear();
        assert!(visible_channels(&r, &selection).is_empty());
    }

    #[test]
    fn carried_selection_keeps_choices_and_adds_new_channels() {
        let before = report(&["K", "C"]);
        let mut selection = init_selection(&before);
        selection.remove("C");

        let after = report(&["K", "C", "LK"]);
        let carried = carry_selection(&selection, &before.active_channels, &after);
        assert_eq!(visible_channels(&after, &carried), vec!["K", "LK"]);
    }
}
