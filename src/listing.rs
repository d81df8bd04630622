use anyhow::{Context, Result};
use std::io::Write;

use crate::abbrev;
use crate::fetch::fetch_each;
use crate::git;
use crate::platform::{App, MergedAddon, PlatformClient, Release};
use crate::render::{AddonRow, AppRow, Format, ReleaseRow, Row, Table};

/// What `ls` lists, picked from its first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noun {
    Apps,
    Releases,
    Addons,
    Dynos,
}

impl Noun {
    /// Splits `args` into the noun and the names that follow it. A first
    /// argument that is not a prefix of a noun is an app name; an empty one
    /// is a prefix of every noun and picks `releases`.
    pub fn parse(args: &[String]) -> (Noun, &[String]) {
        let Some(first) = args.first() else {
            return (Noun::Apps, args);
        };
        let noun = [
            ("releases", Noun::Releases),
            ("addons", Noun::Addons),
            ("dynos", Noun::Dynos),
        ]
        .into_iter()
        .find(|(word, _)| word.starts_with(first.as_str()))
        .map(|(_, noun)| noun);

        match noun {
            Some(noun) => (noun, &args[1..]),
            None => (Noun::Apps, args),
        }
    }

    pub fn needs_app(self) -> bool {
        self != Noun::Apps
    }
}

pub struct Lister<'a> {
    client: &'a PlatformClient,
    fmt: Format,
    app: Option<String>,
}

impl<'a> Lister<'a> {
    pub fn new(client: &'a PlatformClient, fmt: Format, app: Option<String>) -> Self {
        Self { client, fmt, app }
    }

    fn app(&self) -> Result<&str> {
        self.app.as_deref().context("must specify app")
    }

    /// Lists whatever `args` names and writes the aligned result to `out`.
    pub fn run<W: Write>(&self, args: &[String], out: W) -> Result<()> {
        let mut table = Table::new(out);
        let (noun, names) = Noun::parse(args);
        match noun {
            Noun::Apps if names.is_empty() => {
                let apps = self.client.list_apps()?;
                self.print_apps(apps, &mut table)?;
            }
            Noun::Apps => self.list_apps(names, &mut table)?,
            Noun::Releases => self.list_releases(names, &mut table)?,
            Noun::Addons => self.list_addons(names, &mut table)?,
            Noun::Dynos => self.list_dynos(names, &mut table)?,
        }
        table.flush().context("Failed to write listing")
    }

    fn list_apps<W: Write>(&self, names: &[String], table: &mut Table<W>) -> Result<()> {
        let apps = fetch_each(names, |name| self.client.get_app(name))
            .into_iter()
            .flatten()
            .collect();
        self.print_apps(apps, table)
    }

    fn print_apps<W: Write>(&self, mut apps: Vec<App>, table: &mut Table<W>) -> Result<()> {
        apps.sort_by(|a, b| a.name.cmp(&b.name));

        let emails: Vec<&str> = apps.iter().map(|a| a.owner.email.as_str()).collect();
        let (owners, suffix) = abbrev::abbreviate(&emails);

        let attachments = if self.fmt.follow {
            self.follow_attachments(&apps)
        } else {
            vec![Vec::new(); apps.len()]
        };

        for ((app, owner), addons) in apps.iter().zip(owners).zip(&attachments) {
            if app.name.is_empty() {
                continue;
            }
            let row = AppRow {
                app,
                owner,
                attachments: addon_rows(addons, suffix.as_deref()),
            };
            row.render(table, &self.fmt)?;
        }
        Ok(())
    }

    fn follow_attachments(&self, apps: &[App]) -> Vec<Vec<MergedAddon>> {
        let names: Vec<String> = apps.iter().map(|a| a.name.clone()).collect();
        fetch_each(&names, |name| self.client.merged_addons(name))
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect()
    }

    fn list_releases<W: Write>(&self, names: &[String], table: &mut Table<W>) -> Result<()> {
        let app = self.app()?;
        let releases: Vec<Release> = if names.is_empty() {
            self.client.list_releases(app)?
        } else {
            let mut rels: Vec<Release> = fetch_each(names, |name| self.client.get_release(app, name))
                .into_iter()
                .flatten()
                .collect();
            rels.sort_by(|a, b| a.name.cmp(&b.name));
            rels
        };

        let described = if self.fmt.long {
            let mut commits: Vec<&str> = releases
                .iter()
                .filter_map(|r| r.commit.as_deref())
                .filter(|c| !c.is_empty())
                .collect();
            commits.sort_unstable();
            commits.dedup();
            git::describe(&commits)
        } else {
            Default::default()
        };

        let emails: Vec<&str> = releases.iter().map(|r| r.user.email.as_str()).collect();
        let (users, _) = abbrev::abbreviate(&emails);

        for (rel, user) in releases.iter().zip(users) {
            if rel.name.is_empty() {
                continue;
            }
            let row = ReleaseRow {
                name: &rel.name,
                git_ref: rel
                    .commit
                    .as_deref()
                    .map(|c| git::short_ref(c, &described))
                    .unwrap_or_default(),
                user,
                created_at: rel.created_at,
                description: &rel.description,
            };
            row.render(table, &self.fmt)?;
        }
        Ok(())
    }

    fn list_dynos<W: Write>(&self, names: &[String], table: &mut Table<W>) -> Result<()> {
        let mut dynos = self.client.list_dynos(self.app()?)?;
        dynos.sort_by(|a, b| a.name.cmp(&b.name));

        if names.is_empty() {
            for dyno in &dynos {
                dyno.render(table, &self.fmt)?;
            }
            return Ok(());
        }

        for name in names {
            for dyno in dynos.iter().filter(|d| &d.name == name) {
                dyno.render(table, &self.fmt)?;
            }
        }
        Ok(())
    }

    fn list_addons<W: Write>(&self, names: &[String], table: &mut Table<W>) -> Result<()> {
        let addons = self.client.merged_addons(self.app()?)?;
        let tokens: Vec<String> = names.iter().map(|s| s.to_lowercase()).collect();

        for row in addon_rows(&addons, None) {
            if tokens.is_empty() || addon_matches(row.addon, &tokens) {
                row.render(table, &self.fmt)?;
            }
        }
        Ok(())
    }
}

/// Builds display rows for `addons`, shortening owners by `suffix`, or by
/// their own most common suffix when none is given.
fn addon_rows<'a>(addons: &'a [MergedAddon], suffix: Option<&str>) -> Vec<AddonRow<'a>> {
    let suffix = match suffix {
        Some(suffix) => Some(suffix.to_string()),
        None => abbrev::common_suffix(addons.iter().map(|m| m.owner.as_str())),
    };
    addons
        .iter()
        .map(|addon| AddonRow {
            addon,
            owner: abbrev::strip(&addon.owner, suffix.as_deref()),
        })
        .collect()
}

/// True when any lowercased token equals the add-on's type, name or config
/// var, compared case-insensitively.
pub fn addon_matches(addon: &MergedAddon, tokens: &[String]) -> bool {
    let fields = [
        addon.kind.to_lowercase(),
        addon.name.to_lowercase(),
        addon.config_var.to_lowercase(),
    ];
    tokens.iter().any(|token| fields.contains(token))
}
