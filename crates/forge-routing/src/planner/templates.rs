//! Fixed step templates and token budgets.

use forge_core::{Complexity, Intent};

const COMPLEX_STEPS: [&str; 7] = [
    "Define the component hierarchy and the props each child receives",
    "Model the shared state and decide which component owns it",
    "Build the leaf presentational components",
    "Compose the container components and pass state down through props",
    "Add event handlers and derived values",
    "Style every component with Tailwind utility classes",
    "Export the root component as the default export",
];

const VISUALIZATION_STEPS: [&str; 5] = [
    "Define the data shape and realistic sample data",
    "Choose the chart type and configure axes, tooltip and legend",
    "Render the chart with recharts components inside a responsive container",
    "Add controls for filtering or switching the displayed series",
    "Style the layout with Tailwind utility classes",
];

const FORM_STEPS: [&str; 5] = [
    "Define the form fields and their initial state",
    "Render labelled inputs bound to state",
    "Validate input and show inline error messages",
    "Handle submission and show a confirmation state",
    "Style the form with Tailwind utility classes",
];

const GENERIC_STEPS: [&str; 5] = [
    "Define the component state",
    "Implement the core logic",
    "Render the user interface",
    "Wire up event handlers",
    "Style with Tailwind utility classes",
];

/// Ordered steps for a classified request.
#[must_use]
pub fn steps_for(intent: Intent, complexity: Complexity) -> Vec<String> {
    let template: &[&str] = match (complexity, intent) {
        (Complexity::Complex, _) => &COMPLEX_STEPS,
        (_, Intent::Chart | Intent::Visualization) => &VISUALIZATION_STEPS,
        (_, Intent::Form) => &FORM_STEPS,
        _ => &GENERIC_STEPS,
    };
    template.iter().map(|step| (*step).to_owned()).collect()
}

/// Generation token budget for a complexity tier.
#[must_use]
pub const fn token_budget(complexity: Complexity) -> u32 {
    match complexity {
        Complexity::Simple => 2000,
        Complexity::Moderate => 4000,
        Complexity::Complex => 8000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_takes_precedence() {
        let steps = steps_for(Intent::Chart, Complexity::Complex);
        assert_eq!(steps.len(), 7);
        assert!(steps[0].contains("hierarchy"));
    }

    #[test]
    fn test_domain_templates() {
        assert!(steps_for(Intent::Visualization, Complexity::Simple)[2].contains("recharts"));
        assert!(steps_for(Intent::Form, Complexity::Moderate)[2].contains("Validate"));
        assert_eq!(steps_for(Intent::Game, Complexity::Moderate).len(), 5);
    }

    #[test]
    fn test_token_budget() {
        assert_eq!(token_budget(Complexity::Simple), 2000);
        assert_eq!(token_budget(Complexity::Moderate), 4000);
        assert_eq!(token_budget(Complexity::Complex), 8000);
    }
}
