use std::io::Write;

use clap::ValueEnum;
use futures::{stream::BoxStream, TryStreamExt};
use serde::Serialize;

use crate::{
    core::{
        cleanup::DuplicateCluster,
        utils::{datetime_to_string_opt, id_to_string_opt},
    },
    model::{
        duplicate::{DuplicateEmail, DuplicateUsername},
        profile::Profile,
        user::User,
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab separated, one header line
    #[default]
    Table,
    /// One JSON object per line
    Json,
}

pub trait TableRow {
    const HEADER: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl TableRow for DuplicateUsername {
    const HEADER: &'static [&'static str] = &["username", "count"];

    fn cells(&self) -> Vec<String> {
        vec![self.username.clone(), self.count.to_string()]
    }
}

impl TableRow for DuplicateEmail {
    const HEADER: &'static [&'static str] = &["email", "count"];

    fn cells(&self) -> Vec<String> {
        vec![self.email.clone(), self.count.to_string()]
    }
}

impl TableRow for User {
    const HEADER: &'static [&'static str] = &["id", "username", "email", "created_at"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            self.email.clone(),
            datetime_to_string_opt(self.created_at),
        ]
    }
}

impl TableRow for Profile {
    const HEADER: &'static [&'static str] = &["id", "name", "user_id"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            id_to_string_opt(self.user_id),
        ]
    }
}

impl TableRow for DuplicateCluster {
    const HEADER: &'static [&'static str] = &["kept", "deleted"];

    fn cells(&self) -> Vec<String> {
        let deleted: Vec<String> = self.deleted.iter().map(|id| id.to_string()).collect();
        vec![self.kept.to_string(), deleted.join(",")]
    }
}

/// Escapes the characters that would break a tab separated line.
pub fn escape_cell(cell: &str) -> String {
    let mut escaped = String::with_capacity(cell.len());
    for c in cell.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn write_header<T: TableRow, W: Write>(format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    if format == OutputFormat::Table {
        writeln!(out, "{}", T::HEADER.join("\t"))?;
    }
    Ok(())
}

pub fn write_row<T, W>(row: &T, format: OutputFormat, out: &mut W) -> anyhow::Result<()>
where
    T: TableRow + Serialize,
    W: Write,
{
    match format {
        OutputFormat::Table => {
            let cells: Vec<String> = row.cells().iter().map(|c| escape_cell(c)).collect();
            writeln!(out, "{}", cells.join("\t"))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, row)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes rows as the stream yields them. Returns the number of rows written.
pub async fn write_stream<T, W>(
    mut rows: BoxStream<'_, sqlx::Result<T>>,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<usize>
where
    T: TableRow + Serialize,
    W: Write,
{
    write_header::<T, W>(format, out)?;
    let mut count = 0;
    while let Some(row) = rows.try_next().await? {
        write_row(&row, format, out)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
