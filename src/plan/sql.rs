use log::debug;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Pretty-prints the plan's SQL, one clause per line with nested queries
/// indented.
///
/// Text the parser does not accept is shown as given, trimmed.
pub fn format_sql(sql: &str) -> String {
	let sql = sql.trim();
	if sql.is_empty() {
		return String::new();
	}
	match Parser::parse_sql(&GenericDialect {}, sql) {
		Ok(statements) if !statements.is_empty() => statements
			.iter()
			.map(|s| format!("{s:#}"))
			.collect::<Vec<_>>()
			.join(";\n\n"),
		Ok(_) => sql.to_string(),
		Err(e) => {
			debug!("showing unformatted SQL: {e}");
			sql.to_string()
		}
	}
}
