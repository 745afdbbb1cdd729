pub mod plan_editor;
pub mod plan_graph;
pub mod plan_tables;
pub mod sql_view;
pub mod tooltip;
pub mod view_tabs;
