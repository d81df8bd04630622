use std::collections::HashMap;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        log::debug!("git {} exited with {}", args.join(" "), output.status);
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

pub fn remote_url(remote: &str) -> Option<String> {
    let key = format!("remote.{}.url", remote);
    git(&["config", "--get", &key])
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Maps commits to `git describe` names using the local repository.
///
/// All commits are described in one invocation; if any of them is unknown
/// locally git fails and the map comes back empty.
pub fn describe(commits: &[&str]) -> HashMap<String, String> {
    if commits.is_empty() {
        return HashMap::new();
    }
    let mut args = vec!["describe", "--tags", "--always"];
    args.extend_from_slice(commits);
    match git(&args) {
        Some(out) => pair_lines(commits, &out),
        None => HashMap::new(),
    }
}

fn pair_lines(commits: &[&str], out: &str) -> HashMap<String, String> {
    let names: Vec<&str> = out.lines().map(str::trim).collect();
    if names.len() != commits.len() {
        return HashMap::new();
    }
    commits
        .iter()
        .zip(names)
        .map(|(commit, name)| (commit.to_string(), name.to_string()))
        .collect()
}

/// Short form of a commit: its described name if known, else 7 characters.
pub fn short_ref(commit: &str, described: &HashMap<String, String>) -> String {
    match described.get(commit) {
        Some(name) => name.clone(),
        None => commit.chars().take(7).collect(),
    }
}
