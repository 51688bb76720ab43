/// Analyzer tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Loop iterations that merge before switching to widening.
    pub widening_threshold: usize,
    /// Hard cap on loop iterations; variables still changing are given up.
    pub max_iterations: usize,
    /// Report the first statement of each unreachable region.
    pub report_unreachable: bool,
    /// Also report dereferences of values that are only possibly null.
    pub report_nullable_dereference: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            widening_threshold: 3,
            max_iterations: 100,
            report_unreachable: true,
            report_nullable_dereference: false,
        }
    }
}
