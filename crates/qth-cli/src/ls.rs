//! The `ls` command: resolves directories and prints their listings.

use std::io::Write;
use std::time::Duration;

use qth_core::{DirectoryListing, JsonFormat, QthError, Transport, json, resolve, topic};

use crate::AppError;

/// Listing layout selected with `-l` or `-j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum LsFormat {
    /// Child names, directories suffixed with `/`.
    #[default]
    Short,
    /// One `BEHAVIOUR<TAB>name` line per declared behaviour.
    Long,
    /// The listing itself, formatted as JSON.
    Json,
}

/// A fully described `ls` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListRequest {
    pub(crate) path: String,
    pub(crate) recursive: bool,
    pub(crate) format: LsFormat,
    pub(crate) json_format: JsonFormat,
    pub(crate) meta_timeout: Duration,
}

impl ListRequest {
    /// Normalises `path` into a directory path, appending `/` when missing.
    pub(crate) fn directory_path(path: Option<&str>) -> String {
        match path {
            None | Some("") => String::new(),
            Some(path) if path.ends_with('/') => path.to_owned(),
            Some(path) => format!("{path}/"),
        }
    }
}

/// Prints the listing of `request.path`, and with `recursive` every
/// directory beneath it depth-first.
pub(crate) fn list<T, W>(
    request: &ListRequest,
    transport: &mut T,
    output: &mut W,
) -> Result<(), AppError>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
{
    let mut pending = vec![request.path.clone()];
    let mut first = true;

    while let Some(path) = pending.pop() {
        if request.recursive {
            let separator = if first { "" } else { "\n" };
            let header = if path.is_empty() { "[root]" } else { path.as_str() };
            writeln!(output, "{separator}{header}:").map_err(AppError::WriteListing)?;
        }
        first = false;

        let directory = resolve(transport, &path, request.meta_timeout)?;
        let rendered = render(request, directory.path(), directory.text(), directory.listing())?;
        output
            .write_all(rendered.as_bytes())
            .and_then(|()| output.flush())
            .map_err(AppError::WriteListing)?;

        if request.recursive {
            let children: Vec<String> = directory
                .listing()
                .children()
                .filter(|(_, entries)| entries.iter().any(|entry| entry.behaviour().is_directory()))
                .map(|(name, _)| topic::child_directory(&path, name))
                .collect();
            pending.extend(children.into_iter().rev());
        }
    }
    Ok(())
}

fn render(
    request: &ListRequest,
    path: &str,
    text: &str,
    listing: &DirectoryListing,
) -> Result<String, QthError> {
    match request.format {
        LsFormat::Short => Ok(render_short(listing)),
        LsFormat::Long => Ok(render_long(listing)),
        LsFormat::Json => json::format(text, request.json_format)
            .map(|formatted| format!("{formatted}\n"))
            .map_err(|source| QthError::InvalidListing {
                topic: format!("{}{path}", topic::LISTING_ROOT),
                source,
            }),
    }
}

fn render_short(listing: &DirectoryListing) -> String {
    let mut rendered = String::new();
    for (name, entries) in listing.children() {
        let directory = entries.iter().any(|entry| entry.behaviour().is_directory());
        let other = entries.iter().any(|entry| !entry.behaviour().is_directory());
        if directory {
            push_line(&mut rendered, &directory_name(name));
        }
        if other {
            push_line(&mut rendered, name);
        }
    }
    rendered
}

fn render_long(listing: &DirectoryListing) -> String {
    let mut rendered = String::new();
    for (name, entries) in listing.children() {
        for entry in entries {
            let behaviour = entry.behaviour();
            let shown = if behaviour.is_directory() {
                directory_name(name)
            } else {
                name.to_owned()
            };
            push_line(&mut rendered, &format!("{behaviour}\t{shown}"));
        }
    }
    rendered
}

fn directory_name(name: &str) -> String {
    if name.ends_with('/') {
        name.to_owned()
    } else {
        format!("{name}/")
    }
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}
