//! `dbpatch make` — new patch stubs from an embedded tera template.
//!
//! File names are `<YYYY_MM_DD_HHMMSS>_<snake_name>.sql`, so a freshly made
//! patch sorts after every existing one.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{io_err, EngineError};

const TEMPLATE_NAME: &str = "patch.sql.tera";
const TEMPLATE: &str = include_str!("templates/patch.sql.tera");

/// Table a patch name appears to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGuess {
    pub table: String,
    /// The name reads as creating the table rather than changing it.
    pub create: bool,
}

/// What to scaffold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeOptions {
    /// Table to change. Guessed from the name when neither this nor
    /// `create` is set.
    pub table: Option<String>,
    /// Table to create.
    pub create: Option<String>,
}

#[derive(Serialize)]
struct StubContext<'a> {
    name: &'a str,
    table: Option<&'a str>,
    create: bool,
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// `CreateUsersTable`, `create users table` and `create-users-table` all
/// become `create_users_table`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else if c.is_uppercase() {
            if matches!(prev, Some(p) if p.is_lowercase() || p.is_ascii_digit())
                && !out.ends_with('_')
            {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out.trim_end_matches('_').to_string()
}

/// Guess the target table from a snake-case patch name.
///
/// `create_users` and `create_users_table` create `users`;
/// `add_email_to_users_table` (also `from`/`in`, with or without `_table`)
/// changes `users`.
pub fn guess_table(name: &str) -> Option<TableGuess> {
    if let Some(rest) = name.strip_prefix("create_") {
        let table = rest.strip_suffix("_table").unwrap_or(rest);
        if is_word(table) {
            return Some(TableGuess {
                table: table.to_string(),
                create: true,
            });
        }
    }

    for marker in ["_to_", "_from_", "_in_"] {
        if let Some(pos) = name.rfind(marker) {
            let rest = &name[pos + marker.len()..];
            let table = rest.strip_suffix("_table").unwrap_or(rest);
            if is_word(table) {
                return Some(TableGuess {
                    table: table.to_string(),
                    create: false,
                });
            }
        }
    }

    None
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// `2024_01_31_120000_create_users_table.sql`
pub fn file_name(snake_name: &str, now: NaiveDateTime, extension: &str) -> String {
    format!("{}_{snake_name}.{extension}", now.format("%Y_%m_%d_%H%M%S"))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the stub body for `snake_name`.
pub fn render_stub(snake_name: &str, options: &MakeOptions) -> Result<String, EngineError> {
    let guess = match (&options.create, &options.table) {
        (Some(table), _) => Some(TableGuess {
            table: table.clone(),
            create: true,
        }),
        (None, Some(table)) => Some(TableGuess {
            table: table.clone(),
            create: false,
        }),
        (None, None) => guess_table(snake_name),
    };

    let stub = StubContext {
        name: snake_name,
        table: guess.as_ref().map(|g| g.table.as_str()),
        create: guess.as_ref().is_some_and(|g| g.create),
    };

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
    let context = Context::from_serialize(&stub)?;
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}

/// Write a new patch stub into `dir`, creating the directory if needed.
///
/// Refuses to overwrite an existing file.
pub fn make_patch(
    dir: &Path,
    name: &str,
    options: &MakeOptions,
    now: NaiveDateTime,
    extension: &str,
) -> Result<PathBuf, EngineError> {
    let snake = snake_case(name);
    let path = dir.join(file_name(&snake, now, extension));
    if path.exists() {
        return Err(EngineError::PatchExists { path });
    }

    let body = render_stub(&snake, options)?;
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    std::fs::write(&path, body).map_err(|e| io_err(&path, e))?;
    tracing::info!(path = %path.display(), "created patch");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
