//! Hosts file parsing and in-place editing.
//!
//! A [`HostsFile`] keeps the file as raw lines, which are authoritative for
//! rewriting, plus an index of IP -> domains derived from them.
//!
//! # Format
//!
//! ```text
//! # optional comment for the entry below
//! 10.0.0.1 app.test api.test
//! 10.0.0.2 db.test
//! ```
//!
//! Blank lines and lines starting with `#` or `;` are never entries. Lines
//! that have an IP but no domain are ignored by the index.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{HostsError, Result};

/// IP -> domains, in file order per IP. Sorted by IP so lookups are
/// reproducible.
pub type HostsIndex = BTreeMap<String, Vec<String>>;

const BLANKS: [char; 2] = [' ', '\t'];

/// A mapping to add: `<ip> <domain>...` with an optional comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub ip: String,
    pub domains: Vec<String>,
    pub comment: Option<String>,
}

impl Entry {
    /// Entry for `ip` with `domains`, no comment.
    pub fn new<I, S>(ip: impl Into<String>, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ip: ip.into(),
            domains: domains.into_iter().map(Into::into).collect(),
            comment: None,
        }
    }

    /// Attach a comment. Blank comments are dropped.
    pub fn with_comment(mut self, comment: impl AsRef<str>) -> Self {
        let comment = comment.as_ref().trim();
        self.comment = (!comment.is_empty()).then(|| comment.to_string());
        self
    }

    /// `<ip> <domain1> <domain2> ...`
    pub fn mapping_line(&self) -> String {
        mapping_line(&self.ip, &self.domains)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(HostsError::InvalidEntry(reason));
        if self.ip.is_empty() {
            return invalid("IP must not be empty".into());
        }
        if self.ip.contains(char::is_whitespace) {
            return invalid(format!("IP {:?} contains whitespace", self.ip));
        }
        if is_comment(&self.ip) {
            return invalid(format!("IP {:?} starts with a comment marker", self.ip));
        }
        if self.domains.is_empty() {
            return invalid("at least one domain is required".into());
        }
        for (i, domain) in self.domains.iter().enumerate() {
            if domain.is_empty() {
                return invalid("domain must not be empty".into());
            }
            if domain.contains(char::is_whitespace) {
                return invalid(format!("domain {domain:?} contains whitespace"));
            }
            if self.domains[..i].contains(domain) {
                return invalid(format!("domain {domain} given more than once"));
            }
        }
        if let Some(comment) = &self.comment {
            if comment.contains(['\n', '\r']) {
                return invalid("comment must be a single line".into());
            }
        }
        Ok(())
    }
}

fn mapping_line(ip: &str, domains: &[String]) -> String {
    let mut line = String::from(ip);
    for domain in domains {
        line.push(' ');
        line.push_str(domain);
    }
    line
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';')
}

/// Leading IP token of an entry line; `None` for blank and comment lines.
fn entry_ip(line: &str) -> Option<&str> {
    let line = line.trim_matches([' ', '\t', '\r']);
    if line.is_empty() || is_comment(line) {
        return None;
    }
    line.split(BLANKS).next()
}

fn split_lines(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

/// Parse hosts file text into IP -> domains.
///
/// Malformed lines are skipped. Domains of repeated IPs are appended in
/// file order without deduplication.
pub fn parse(text: &str) -> HostsIndex {
    let mut index = HostsIndex::new();
    for raw in text.trim_matches([' ', '\t', '\r', '\n']).split('\n') {
        let line = raw.trim_matches(BLANKS).replace('\t', " ");
        if line.is_empty() || is_comment(&line) {
            continue;
        }
        let Some((ip, rest)) = line.split_once(' ') else {
            continue;
        };
        let domains: Vec<String> = rest.split_whitespace().map(String::from).collect();
        if domains.is_empty() {
            continue;
        }
        index.entry(ip.to_string()).or_default().extend(domains);
    }
    index
}

/// Hosts file loaded for editing. Every mutation is written back to disk
/// before it returns.
///
/// Lines are kept as raw bytes so text in other encodings (e.g. a Latin-1
/// comment) survives untouched; only entry tokens are decoded.
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    lines: Vec<Vec<u8>>,
    index: HostsIndex,
}

impl HostsFile {
    /// Read and parse the file at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) => return Err(HostsError::FileRead { path, source }),
        };
        let hosts = Self::from_bytes(path, &bytes);
        debug!(
            path = %hosts.path.display(),
            ips = hosts.index.len(),
            "loaded hosts file"
        );
        Ok(hosts)
    }

    /// Build from already-read text; mutations will write to `path`.
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self::from_bytes(path, text.as_bytes())
    }

    /// Build from raw file content; mutations will write to `path`.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            lines: split_lines(bytes),
            index: parse(&String::from_utf8_lossy(bytes)),
        }
    }

    /// Path mutations are written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File lines without their `\n`, decoded lossily for display.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> + '_ {
        self.lines.iter().map(|line| String::from_utf8_lossy(line))
    }

    /// IP -> domains as currently in the file.
    pub fn index(&self) -> &HostsIndex {
        &self.index
    }

    /// Current file content, as it was last written.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.lines.join(&b'\n')
    }

    /// Current file content, decoded lossily.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Domains mapped to `ip`, in file order.
    pub fn domains(&self, ip: &str) -> Option<&[String]> {
        self.index.get(ip).map(Vec::as_slice)
    }

    /// Whether `ip` has at least one domain.
    pub fn ip_exists(&self, ip: &str) -> bool {
        self.index.contains_key(ip)
    }

    /// Owning IP and position of `domain` in that IP's list.
    pub fn domain_exists(&self, domain: &str) -> Option<(&str, usize)> {
        self.index.iter().find_map(|(ip, domains)| {
            domains
                .iter()
                .position(|d| d == domain)
                .map(|pos| (ip.as_str(), pos))
        })
    }

    /// First domain of `domains` (in the given order) already present.
    pub fn any_domain_exists<'a, S: AsRef<str>>(&self, domains: &'a [S]) -> Option<&'a str> {
        domains
            .iter()
            .map(AsRef::as_ref)
            .find(|domain| self.domain_exists(domain).is_some())
    }

    /// Add a mapping.
    ///
    /// A new IP is appended to the end of the file, with its comment line
    /// above it. For a known IP the new domains are prepended to its
    /// existing ones and its line is rewritten; the comment is not used.
    pub fn add_mapping(&mut self, entry: Entry) -> Result<()> {
        entry.validate()?;
        if let Some(domain) = self.any_domain_exists(&entry.domains) {
            return Err(HostsError::DuplicateDomain(domain.to_string()));
        }
        match self.index.get(&entry.ip) {
            Some(existing) => {
                if entry.comment.is_some() {
                    debug!(ip = %entry.ip, "comment ignored when updating an existing mapping");
                }
                let mut domains = entry.domains;
                domains.extend(existing.iter().cloned());
                self.replace_mapping(&entry.ip, domains)
            }
            None => self.append_mapping(entry),
        }
    }

    /// Remove every entry line for `ip`, each with a directly preceding
    /// `#` comment line. The file is rewritten even when nothing matched.
    /// Returns whether any line was removed.
    pub fn remove_mapping(&mut self, ip: &str) -> Result<bool> {
        let (lines, matched) = self.edited_lines(ip, None);
        self.write_lines(&lines)?;
        self.lines = lines;
        self.index.remove(ip);
        if matched == 0 {
            warn!(ip, "no mapping found");
        } else {
            info!(ip, lines = matched, "removed mapping");
        }
        Ok(matched > 0)
    }

    /// Remove a single domain. When it is the last domain of its IP, the
    /// whole mapping goes, comment included.
    pub fn remove_domain(&mut self, domain: &str) -> Result<()> {
        let Some((ip, position)) = self.domain_exists(domain) else {
            return Err(HostsError::DomainNotFound(domain.to_string()));
        };
        let ip = ip.to_string();
        let mut domains = self.index.get(&ip).cloned().unwrap_or_default();
        if domains.len() == 1 {
            self.remove_mapping(&ip)?;
            return Ok(());
        }
        domains.remove(position);
        self.replace_mapping(&ip, domains)
    }

    /// Whether the file already uses `\r\n` line endings.
    fn uses_crlf(&self) -> bool {
        self.lines.iter().any(|line| line.ends_with(b"\r"))
    }

    fn append_mapping(&mut self, entry: Entry) -> Result<()> {
        let newline = if self.uses_crlf() { "\r\n" } else { "\n" };
        let mut current = self.to_bytes();
        let mut appended = String::new();
        if !current.is_empty() && !current.ends_with(b"\n") {
            appended.push_str(newline);
        }
        if let Some(comment) = &entry.comment {
            appended.push_str("# ");
            appended.push_str(comment);
            appended.push_str(newline);
        }
        appended.push_str(&entry.mapping_line());
        appended.push_str(newline);

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_error(source))?;
        file.write_all(appended.as_bytes())
            .map_err(|source| self.write_error(source))?;
        file.sync_all().map_err(|source| self.write_error(source))?;

        current.extend_from_slice(appended.as_bytes());
        self.lines = split_lines(&current);
        info!(ip = %entry.ip, domains = entry.domains.len(), "appended mapping");
        self.index.insert(entry.ip, entry.domains);
        Ok(())
    }

    /// Rewrite the line of `ip` with `domains`, dropping any further lines
    /// for the same IP.
    fn replace_mapping(&mut self, ip: &str, domains: Vec<String>) -> Result<()> {
        let (lines, matched) = self.edited_lines(ip, Some(mapping_line(ip, &domains)));
        self.write_lines(&lines)?;
        self.lines = lines;
        if matched > 1 {
            debug!(ip, lines = matched, "merged repeated lines for ip");
        }
        info!(ip, domains = domains.len(), "rewrote mapping");
        self.index.insert(ip.to_string(), domains);
        Ok(())
    }

    /// Lines with the entries for `ip` edited: the first one becomes
    /// `replacement` if given (keeping a trailing `\r`), the others are
    /// removed together with a directly preceding `#` line. Untouched
    /// lines are copied byte for byte. Also returns how many lines matched.
    fn edited_lines(&self, ip: &str, replacement: Option<String>) -> (Vec<Vec<u8>>, usize) {
        let mut replacement = replacement;
        let mut lines: Vec<Vec<u8>> = Vec::with_capacity(self.lines.len());
        let mut matched = 0;
        let mut prev_is_comment = false;
        for line in &self.lines {
            let text = String::from_utf8_lossy(line);
            if entry_ip(&text) != Some(ip) {
                prev_is_comment = text.trim_start_matches(BLANKS).starts_with('#');
                lines.push(line.clone());
                continue;
            }
            matched += 1;
            if let Some(mapping) = replacement.take() {
                let mut mapping = mapping.into_bytes();
                if line.ends_with(b"\r") {
                    mapping.push(b'\r');
                }
                lines.push(mapping);
            } else if prev_is_comment {
                lines.pop();
            }
            prev_is_comment = false;
        }
        (lines, matched)
    }

    fn write_lines(&self, lines: &[Vec<u8>]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| self.write_error(source))?;
        file.write_all(&lines.join(&b'\n'))
            .map_err(|source| self.write_error(source))?;
        file.sync_all().map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: io::Error) -> HostsError {
        HostsError::FileWrite {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(text: &str) -> HostsFile {
        HostsFile::from_text("unused", text)
    }

    fn text(lines: &[Vec<u8>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    #[test]
    fn test_parse_simple() {
        let index = parse("10.0.0.1 a.test b.test\n10.0.0.2 c.test\n");
        assert_eq!(index["10.0.0.1"], vec!["a.test", "b.test"]);
        assert_eq!(index["10.0.0.2"], vec!["c.test"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let index = parse("# hosts\n\n; legacy\n   \n10.0.0.1 a.test\n#10.0.0.2 b.test\n");
        assert_eq!(index.len(), 1);
        assert_eq!(index["10.0.0.1"], vec!["a.test"]);
    }

    #[test]
    fn test_parse_tabs_and_padding() {
        let index = parse("\t 127.0.0.1\tlocalhost \t  loopback.test  \n");
        assert_eq!(index["127.0.0.1"], vec!["localhost", "loopback.test"]);
    }

    #[test]
    fn test_parse_appends_repeated_ip() {
        let index = parse("10.0.0.1 a.test\n10.0.0.2 x.test\n10.0.0.1 b.test a.test\n");
        assert_eq!(index["10.0.0.1"], vec!["a.test", "b.test", "a.test"]);
    }

    #[test]
    fn test_parse_malformed_lines() {
        let index = parse("10.0.0.1\njust-a-token\n10.0.0.2   \n10.0.0.3 ok.test\n");
        assert_eq!(index.len(), 1);
        assert_eq!(index["10.0.0.3"], vec!["ok.test"]);
    }

    #[test]
    fn test_parse_windows_line_endings() {
        let index = parse("10.0.0.1 a.test\r\n10.0.0.2 b.test\r\n");
        assert_eq!(index["10.0.0.1"], vec!["a.test"]);
        assert_eq!(index["10.0.0.2"], vec!["b.test"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n# only comments\n").is_empty());
    }

    #[test]
    fn test_entry_ip() {
        assert_eq!(entry_ip("10.0.0.1 a.test"), Some("10.0.0.1"));
        assert_eq!(entry_ip("  10.0.0.1\ta.test"), Some("10.0.0.1"));
        assert_eq!(entry_ip("# 10.0.0.1 a.test"), None);
        assert_eq!(entry_ip("; 10.0.0.1"), None);
        assert_eq!(entry_ip("   "), None);
    }

    #[test]
    fn test_domain_lookup() {
        let h = hosts("10.0.0.2 c.test\n10.0.0.1 a.test b.test\n");
        assert!(h.ip_exists("10.0.0.1"));
        assert!(!h.ip_exists("10.0.0.3"));
        assert_eq!(h.domain_exists("b.test"), Some(("10.0.0.1", 1)));
        assert_eq!(h.domain_exists("c.test"), Some(("10.0.0.2", 0)));
        assert_eq!(h.domain_exists("nope.test"), None);
        assert_eq!(
            h.any_domain_exists(&["nope.test", "c.test", "a.test"]),
            Some("c.test")
        );
        assert_eq!(h.any_domain_exists(&["nope.test"]), None);
    }

    #[test]
    fn test_edited_lines_exact_ip_token() {
        let h = hosts("10.0.0.10 ten.test\n10.0.0.1 one.test\n");
        let (lines, matched) = h.edited_lines("10.0.0.1", None);
        assert_eq!(matched, 1);
        assert_eq!(text(&lines), vec!["10.0.0.10 ten.test", ""]);
    }

    #[test]
    fn test_edited_lines_drops_comment_above() {
        let h = hosts("# first\n10.0.0.1 a.test\n127.0.0.1 localhost\n# second\n10.0.0.2 b.test\n");
        let (lines, _) = h.edited_lines("10.0.0.1", None);
        assert_eq!(text(&lines), vec!["127.0.0.1 localhost", "# second", "10.0.0.2 b.test", ""]);
    }

    #[test]
    fn test_edited_lines_replaces_first_and_merges_rest() {
        let h = hosts("10.0.0.1 a.test\n10.0.0.2 x.test\n# dup\n10.0.0.1 b.test\n");
        let domains = vec!["a.test".to_string(), "b.test".to_string()];
        let replacement = mapping_line("10.0.0.1", &domains);
        let (lines, matched) = h.edited_lines("10.0.0.1", Some(replacement));
        assert_eq!(matched, 2);
        assert_eq!(text(&lines), vec!["10.0.0.1 a.test b.test", "10.0.0.2 x.test", ""]);
    }

    #[test]
    fn test_entry_validation() {
        assert!(Entry::new("10.0.0.1", ["a.test"]).validate().is_ok());
        assert!(Entry::new("", ["a.test"]).validate().is_err());
        assert!(Entry::new("10.0.0.1 x", ["a.test"]).validate().is_err());
        assert!(Entry::new("#10.0.0.1", ["a.test"]).validate().is_err());
        assert!(Entry::new("10.0.0.1", Vec::<String>::new()).validate().is_err());
        assert!(Entry::new("10.0.0.1", ["a.test", "a.test"]).validate().is_err());
        assert!(Entry::new("10.0.0.1", ["a test"]).validate().is_err());
    }

    #[test]
    fn test_entry_comment() {
        let entry = Entry::new("10.0.0.1", ["a.test"]).with_comment("  ");
        assert_eq!(entry.comment, None);
        let entry = Entry::new("10.0.0.1", ["a.test"]).with_comment(" web ");
        assert_eq!(entry.comment.as_deref(), Some("web"));
        assert_eq!(entry.mapping_line(), "10.0.0.1 a.test");
    }

    #[test]
    fn test_edited_lines_keeps_crlf_on_replaced_line() {
        let h = hosts("10.0.0.1 a.test b.test\r\n10.0.0.2 c.test\r\n");
        let (lines, _) = h.edited_lines("10.0.0.1", Some("10.0.0.1 b.test".into()));
        assert_eq!(lines.join(&b'\n'), b"10.0.0.1 b.test\r\n10.0.0.2 c.test\r\n");
    }

    #[test]
    fn test_edited_lines_keeps_non_utf8_bytes() {
        let h = HostsFile::from_bytes("unused", b"# caf\xe9\n10.0.0.1 a.test\n10.0.0.2 b.test\n");
        let (lines, _) = h.edited_lines("10.0.0.2", None);
        assert_eq!(lines.join(&b'\n'), b"# caf\xe9\n10.0.0.1 a.test\n");
    }
}
