use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::io::{self, Write};
use std::time::Duration;
use tabwriter::TabWriter;

use crate::platform::{App, Dyno, MergedAddon};

const COLUMN_GAP: usize = 2;
const OWNER_WIDTH: usize = 10;
const RECENT_DAYS: i64 = 360;

/// Tab separated output aligned by `TabWriter`: every tab-terminated cell is
/// padded to the widest cell of its column block, the last cell of a row is
/// written as is.
pub struct Table<W: Write> {
    out: TabWriter<W>,
}

impl<W: Write> Table<W> {
    pub fn new(w: W) -> Self {
        Self {
            out: TabWriter::new(w).minwidth(1).padding(COLUMN_GAP),
        }
    }

    pub fn row<I, S>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            line.push_str(field.as_ref());
        }
        writeln!(self.out, "{}", line)
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Output settings shared by every row renderer.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    pub long: bool,
    pub follow: bool,
    pub now: DateTime<Utc>,
}

impl Format {
    pub fn new(long: bool, follow: bool) -> Self {
        Self {
            long,
            follow,
            now: Utc::now(),
        }
    }
}

pub trait Row {
    fn render<W: Write>(&self, table: &mut Table<W>, fmt: &Format) -> io::Result<()>;
}

/// `Mon _2 15:04` for times within the last year, `Mon _2  2006` otherwise.
pub fn human_time<Tz>(t: &DateTime<Tz>, now: DateTime<Utc>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if now - t.with_timezone(&Utc) < chrono::Duration::days(RECENT_DAYS) {
        t.format("%b %e %H:%M").to_string()
    } else {
        t.format("%b %e  %Y").to_string()
    }
}

fn local_time(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    human_time(&t.with_timezone(&Local), now)
}

pub fn human_duration(d: Duration) -> String {
    const SECOND: Duration = Duration::from_secs(1);
    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(60 * 60);
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    for (unit, code) in [(DAY, 'd'), (HOUR, 'h'), (MINUTE, 'm')] {
        if d > unit * 2 {
            return in_unit(d, unit, code);
        }
    }
    in_unit(d, SECOND, 's')
}

fn in_unit(d: Duration, unit: Duration, code: char) -> String {
    let unit = unit.as_nanos();
    let n = (d.as_nanos() + unit / 2).saturating_sub(1) / unit;
    format!("{:2}{}", n, code)
}

/// Truncates `s` to `n` characters, the last one being an ellipsis.
pub fn abbrev(s: &str, n: usize) -> String {
    if s.chars().count() > n {
        let mut short: String = s.chars().take(n.saturating_sub(1)).collect();
        short.push('…');
        short
    } else {
        s.to_string()
    }
}

/// Quotes `s` as a JSON string unless it is made only of `[A-Za-z0-9_-]`.
pub fn maybe_quote(s: &str) -> String {
    if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        s.to_string()
    } else {
        serde_json::Value::String(s.to_string()).to_string()
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        "?"
    } else {
        s
    }
}

/// An add-on as displayed, with its owner shortened.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonRow<'a> {
    pub addon: &'a MergedAddon,
    pub owner: String,
}

impl Row for AddonRow<'_> {
    fn render<W: Write>(&self, table: &mut Table<W>, fmt: &Format) -> io::Result<()> {
        if !fmt.long {
            return table.line(&self.addon.short_name());
        }
        table.row([
            self.addon.kind.as_str(),
            abbrev(&self.owner, OWNER_WIDTH).as_str(),
            or_unknown(&self.addon.name),
            or_unknown(&self.addon.config_var),
        ])
    }
}

/// An app as displayed, with its owner shortened and, in follow mode, the
/// add-ons attached to it.
#[derive(Debug, Clone)]
pub struct AppRow<'a> {
    pub app: &'a App,
    pub owner: String,
    pub attachments: Vec<AddonRow<'a>>,
}

impl Row for AppRow<'_> {
    fn render<W: Write>(&self, table: &mut Table<W>, fmt: &Format) -> io::Result<()> {
        if !fmt.long {
            table.line(&self.app.name)?;
            if fmt.follow {
                for att in &self.attachments {
                    if att.addon.name.is_empty() {
                        table.line(&format!("({})", att.addon.kind))?;
                    } else {
                        table.line(&att.addon.name)?;
                    }
                }
            }
            return Ok(());
        }

        let kb = self.app.slug_size.unwrap_or(0).div_ceil(1000);
        let mut fields = Vec::with_capacity(6);
        if fmt.follow {
            fields.push("-".to_string());
        }
        fields.extend([
            "app".to_string(),
            abbrev(&self.owner, OWNER_WIDTH),
            format!("{:6}k", kb),
            local_time(self.app.last_activity(), fmt.now),
            self.app.name.clone(),
        ]);
        table.row(fields)?;

        if fmt.follow {
            for att in &self.attachments {
                table.row([
                    " ",
                    att.addon.kind.as_str(),
                    abbrev(&att.owner, OWNER_WIDTH).as_str(),
                    "     ?k",
                    "",
                    or_unknown(&att.addon.name),
                    or_unknown(&att.addon.config_var),
                ])?;
            }
        }
        Ok(())
    }
}

/// A release as displayed, with the commit resolved to a git ref and the
/// author shortened.
#[derive(Debug, Clone)]
pub struct ReleaseRow<'a> {
    pub name: &'a str,
    pub git_ref: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub description: &'a str,
}

impl Row for ReleaseRow<'_> {
    fn render<W: Write>(&self, table: &mut Table<W>, fmt: &Format) -> io::Result<()> {
        if !fmt.long {
            return table.line(self.name);
        }
        table.row([
            abbrev(&self.git_ref, OWNER_WIDTH).as_str(),
            abbrev(&self.user, OWNER_WIDTH).as_str(),
            local_time(self.created_at, fmt.now).as_str(),
            self.name,
            self.description,
        ])
    }
}

impl Row for Dyno {
    fn render<W: Write>(&self, table: &mut Table<W>, fmt: &Format) -> io::Result<()> {
        if !fmt.long {
            return table.line(&self.name);
        }
        table.row([
            self.name.as_str(),
            self.state.as_str(),
            human_duration(self.age(fmt.now)).as_str(),
            maybe_quote(&self.command).as_str(),
        ])
    }
}
