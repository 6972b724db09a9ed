//! The static task registry.
//!
//! Tasks are declared once per invocation; every run recomputes the graph
//! from this registry. The edges mirror the asset flow: cleans feed their
//! producers, wiring feeds injection, injection feeds templates and
//! optimize, and `build` assembles everything.

use crate::pipeline::task::{Task, TaskAction, TaskPlan};

pub const CLEAN_STYLES: &str = "clean-styles";
pub const CLEAN_FONTS: &str = "clean-fonts";
pub const CLEAN_IMAGES: &str = "clean-images";
pub const CLEAN_CODE: &str = "clean-code";
pub const CLEAN: &str = "clean";
pub const STYLES: &str = "styles";
pub const FONTS: &str = "fonts";
pub const IMAGES: &str = "images";
pub const WIREDEP: &str = "wiredep";
pub const INJECT: &str = "inject";
pub const TEMPLATES: &str = "templates";
pub const OPTIMIZE: &str = "optimize";
pub const BUILD: &str = "build";

/// Create the full task plan.
pub fn create_task_plan() -> TaskPlan {
    let mut plan = TaskPlan::new();

    plan.add_task(Task::new(CLEAN_STYLES, TaskAction::CleanStyles));
    plan.add_task(Task::new(CLEAN_FONTS, TaskAction::CleanFonts));
    plan.add_task(Task::new(CLEAN_IMAGES, TaskAction::CleanImages));
    plan.add_task(Task::new(CLEAN_CODE, TaskAction::CleanCode));
    plan.add_task(Task::new(CLEAN, TaskAction::CleanAll));

    plan.add_task(Task::new(STYLES, TaskAction::Styles).with_deps(&[CLEAN_STYLES]));
    plan.add_task(Task::new(FONTS, TaskAction::Fonts).with_deps(&[CLEAN_FONTS]));
    plan.add_task(Task::new(IMAGES, TaskAction::Images).with_deps(&[CLEAN_IMAGES]));

    plan.add_task(Task::new(WIREDEP, TaskAction::Wiredep));
    plan.add_task(Task::new(INJECT, TaskAction::Inject).with_deps(&[WIREDEP, STYLES]));
    plan.add_task(Task::new(TEMPLATES, TaskAction::Templates).with_deps(&[INJECT]));
    plan.add_task(Task::new(OPTIMIZE, TaskAction::Optimize).with_deps(&[INJECT]));

    plan.add_task(
        Task::new(BUILD, TaskAction::DiscardTemp).with_deps(&[OPTIMIZE, IMAGES, FONTS]),
    );

    plan
}

/// Names of every registry task, in declaration order.
pub fn task_names() -> Vec<&'static str> {
    vec![
        CLEAN_STYLES,
        CLEAN_FONTS,
        CLEAN_IMAGES,
        CLEAN_CODE,
        CLEAN,
        STYLES,
        FONTS,
        IMAGES,
        WIREDEP,
        INJECT,
        TEMPLATES,
        OPTIMIZE,
        BUILD,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_acyclic() {
        let plan = create_task_plan();
        assert!(plan.build_order().is_ok());
    }

    #[test]
    fn test_registry_contains_every_named_task() {
        let plan = create_task_plan();
        for name in task_names() {
            assert!(plan.get(name).is_some(), "missing task {}", name);
        }
        assert_eq!(plan.len(), task_names().len());
    }

    #[test]
    fn test_build_closure() {
        let plan = create_task_plan();
        let closure = plan.closure(BUILD).unwrap();

        for name in [
            CLEAN_STYLES,
            CLEAN_FONTS,
            CLEAN_IMAGES,
            STYLES,
            FONTS,
            IMAGES,
            WIREDEP,
            INJECT,
            OPTIMIZE,
            BUILD,
        ] {
            assert!(closure.contains(name), "build closure missing {}", name);
        }
        // templates is a serve-dev concern; clean-code and clean are manual
        assert!(!closure.contains(TEMPLATES));
        assert!(!closure.contains(CLEAN_CODE));
        assert!(!closure.contains(CLEAN));
    }

    #[test]
    fn test_styles_runs_after_clean_styles() {
        let plan = create_task_plan();
        let order: Vec<_> =
            plan.ordered_closure(STYLES).unwrap().iter().map(|t| t.name.clone()).collect();
        assert_eq!(order, vec![CLEAN_STYLES.to_string(), STYLES.to_string()]);
    }

    #[test]
    fn test_inject_depends_on_wiredep_and_styles() {
        let plan = create_task_plan();
        let order: Vec<_> =
            plan.ordered_closure(INJECT).unwrap().iter().map(|t| t.name.clone()).collect();

        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos(WIREDEP) < pos(INJECT));
        assert!(pos(STYLES) < pos(INJECT));
        assert!(pos(CLEAN_STYLES) < pos(STYLES));
    }
}
