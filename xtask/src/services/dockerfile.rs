//! Just enough of a Dockerfile reader to check the build image: `ENV` values, apt
//! packages and the position of `dpkg --add-architecture`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const ADD_ARCHITECTURE: &str = "dpkg --add-architecture";
const APT_INSTALL: [&str; 2] = ["apt-get install", "apt install"];

/// One instruction with continuations joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// 1-based line the instruction starts on.
    pub line: usize,
    /// Upper-cased keyword, e.g. `ENV`.
    pub keyword: String,
    pub args: String,
}

/// Where `dpkg --add-architecture` sits relative to the first package install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchitectureOrder {
    /// Added before anything is installed.
    BeforeInstall,
    /// Added only after an install already ran; foreign packages fail to resolve.
    AfterInstall { added: usize, installed: usize },
    /// Never added.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dockerfile {
    instructions: Vec<Instruction>,
}

impl Dockerfile {
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read Dockerfile at {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut instructions = Vec::new();
        let mut pending: Option<(usize, String)> = None;

        for (index, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            // Comments are dropped even in the middle of a continued instruction.
            if trimmed.starts_with('#') || (trimmed.is_empty() && pending.is_none()) {
                continue;
            }

            let (body, continues) = match trimmed.strip_suffix('\\') {
                Some(body) => (body.trim_end(), true),
                None => (trimmed, false),
            };

            let (start, mut joined) = pending.take().unwrap_or((index + 1, String::new()));
            if !joined.is_empty() && !body.is_empty() {
                joined.push(' ');
            }
            joined.push_str(body);

            if continues {
                pending = Some((start, joined));
            } else if let Some(instruction) = split_instruction(start, &joined) {
                instructions.push(instruction);
            }
        }

        if let Some((start, joined)) = pending
            && let Some(instruction) = split_instruction(start, &joined)
        {
            instructions.push(instruction);
        }

        Self { instructions }
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Every variable set by `ENV`, in order, for both `ENV K=V ...` and legacy `ENV K V`.
    #[must_use]
    pub fn env(&self) -> Vec<(String, String)> {
        self.with_keyword("ENV").flat_map(|instruction| parse_env(&instruction.args)).collect()
    }

    /// Packages named in `apt-get install` commands, flags removed.
    #[must_use]
    pub fn apt_packages(&self) -> Vec<String> {
        let mut packages = Vec::new();
        for instruction in self.with_keyword("RUN") {
            for command in instruction.args.split("&&").map(str::trim) {
                let Some(rest) = APT_INSTALL.iter().find_map(|install| command.strip_prefix(install))
                else {
                    continue;
                };
                packages.extend(
                    rest.split_whitespace().filter(|word| !word.starts_with('-')).map(str::to_owned),
                );
            }
        }
        packages
    }

    /// Checks that foreign architectures are registered before the first install.
    #[must_use]
    pub fn architecture_order(&self) -> ArchitectureOrder {
        let mut first_install = None;

        for instruction in self.with_keyword("RUN") {
            let args = &instruction.args;
            let installed = APT_INSTALL.iter().filter_map(|install| args.find(install)).min();

            if let Some(added) = args.find(ADD_ARCHITECTURE) {
                let installed = first_install.or_else(|| {
                    installed.filter(|at| *at < added).map(|_| instruction.line)
                });
                return match installed {
                    Some(installed) => {
                        ArchitectureOrder::AfterInstall { added: instruction.line, installed }
                    },
                    None => ArchitectureOrder::BeforeInstall,
                };
            }

            if installed.is_some() && first_install.is_none() {
                first_install = Some(instruction.line);
            }
        }

        ArchitectureOrder::Missing
    }

    /// Exec-form arguments of the last `ENTRYPOINT`.
    #[must_use]
    pub fn entrypoint(&self) -> Option<Vec<String>> {
        self.with_keyword("ENTRYPOINT").last().and_then(|instruction| exec_form(&instruction.args))
    }

    /// Exec-form arguments of the last `CMD`.
    #[must_use]
    pub fn cmd(&self) -> Option<Vec<String>> {
        self.with_keyword("CMD").last().and_then(|instruction| exec_form(&instruction.args))
    }

    fn with_keyword<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Instruction> {
        self.instructions.iter().filter(move |instruction| instruction.keyword == keyword)
    }
}

fn split_instruction(line: usize, joined: &str) -> Option<Instruction> {
    let joined = joined.trim();
    if joined.is_empty() {
        return None;
    }
    let (keyword, args) = joined.split_once(char::is_whitespace).unwrap_or((joined, ""));
    Some(Instruction { line, keyword: keyword.to_ascii_uppercase(), args: args.trim().to_owned() })
}

fn parse_env(args: &str) -> Vec<(String, String)> {
    let tokens = shell_words(args);
    let Some(first) = tokens.first() else {
        return Vec::new();
    };

    if first.contains('=') {
        return tokens
            .iter()
            .filter_map(|token| token.split_once('='))
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
    }

    // Legacy form: everything after the name is the value.
    let value = args.trim_start().strip_prefix(first.as_str()).unwrap_or_default().trim();
    vec![(first.clone(), unquote(value))]
}

/// Splits on unquoted whitespace, removing quotes and backslash escapes.
fn shell_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            },
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            (None, c) => {
                current.push(c);
                in_word = true;
            },
        }
    }

    if in_word {
        words.push(current);
    }
    words
}

fn unquote(value: &str) -> String {
    shell_words(value).join(" ")
}

fn exec_form(args: &str) -> Option<Vec<String>> {
    let inner = args.trim().strip_prefix('[')?.strip_suffix(']')?;
    inner
        .split(',')
        .map(|item| {
            let item = item.trim();
            item.strip_prefix('"').and_then(|item| item.strip_suffix('"')).map(str::to_owned)
        })
        .collect()
}
