//! Repository selection: `--all`, `--select EXPR` or a line-based prompt.
//!
//! Expressions are comma separated 1-based numbers and inclusive ranges
//! (`1-3,7`; `5-2` means `2-5`). Every occurrence toggles, so `1,1` selects
//! nothing. `all` and `none` replace the whole selection.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use mgc_core::repository::Repository;

use super::SelectArgs;

/// Selected flags, one per listed repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    selected: Vec<bool>,
}

impl Selection {
    pub fn none(count: usize) -> Self {
        Self {
            selected: vec![false; count],
        }
    }

    pub fn all(count: usize) -> Self {
        Self {
            selected: vec![true; count],
        }
    }

    pub fn len(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Apply one input line. The selection is unchanged when the line is invalid.
    pub fn apply(&mut self, input: &str) -> Result<()> {
        let input = input.trim().to_ascii_lowercase();
        match input.as_str() {
            "all" => self.selected.iter_mut().for_each(|s| *s = true),
            "none" => self.selected.iter_mut().for_each(|s| *s = false),
            expr => {
                for index in parse_toggles(expr, self.selected.len())? {
                    self.selected[index] = !self.selected[index];
                }
            }
        }
        Ok(())
    }

    /// Selected items, in listing order.
    pub fn pick<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(item, _)| item.clone())
            .collect()
    }
}

/// 0-based indices toggled by `expr`, in expression order (duplicates kept).
pub fn parse_toggles(expr: &str, count: usize) -> Result<Vec<usize>> {
    let mut toggles = Vec::new();
    for part in expr.split(',').map(str::trim) {
        if part.is_empty() {
            bail!("empty entry in selection");
        }
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_number(a)?, parse_number(b)?),
            None => {
                let n = parse_number(part)?;
                (n, n)
            }
        };
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        for num in start..=end {
            if num == 0 || num > count {
                bail!("repository number {} is out of range (1-{})", num, count);
            }
            toggles.push(num - 1);
        }
    }
    Ok(toggles)
}

fn parse_number(s: &str) -> Result<usize> {
    let s = s.trim();
    s.parse::<usize>()
        .with_context(|| format!("invalid number: {:?}", s))
}

/// Resolve the selection from flags, or prompt when neither flag is given.
pub fn choose(repos: &[Arc<Repository>], args: &SelectArgs) -> Result<Vec<Arc<Repository>>> {
    if args.all {
        return Ok(repos.to_vec());
    }
    let selection = match &args.select {
        Some(expr) => {
            let mut selection = Selection::none(repos.len());
            selection.apply(expr).context("invalid --select expression")?;
            selection
        }
        None => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            prompt(repos.len(), &mut stdin.lock(), &mut stdout.lock())?
        }
    };
    Ok(selection.pick(repos))
}

/// Line-based selector. Reads until `done` or end of input.
pub fn prompt<R: BufRead, W: Write>(count: usize, input: &mut R, out: &mut W) -> Result<Selection> {
    let mut selection = Selection::none(count);
    writeln!(out, "Enter numbers to select/deselect (e.g. 1,3,5 or 1-5),")?;
    writeln!(out, "'all', 'none', or 'done' when finished.")?;
    loop {
        write!(out, "Selection [{} of {}]: ", selection.len(), count)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("done") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if let Err(e) = selection.apply(line) {
            writeln!(out, "Invalid selection: {:#}", e)?;
        }
    }
    Ok(selection)
}
