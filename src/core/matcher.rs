// src/core/matcher.rs

//! # Matcher
//!
//! Resolves a single argv token to a command or a flag of the current command
//! chain, extracts the flag's value and assigns it.
//!
//! Flag resolution order, per command, starting at the current one:
//!
//! 1. exact title (long form splits at `=`), honoring `~~`-only flags;
//! 2. longest title that prefixes the text (the suffix stays in the package);
//! 3. dynamic flags, exact;
//! 4. the head-like flag, for `-<number>`.
//!
//! Every ancestor is searched the same way and the longest match wins, the
//! nearest command winning ties.

use crate::constants::PASSWORD_HELPER;
use crate::core::coerce::{self, Strictness};
use crate::core::config_loader::EngineConfig;
use crate::core::errors::{EngineError, EngineResult};
use crate::core::session::ParseContext;
use crate::core::store::Store;
use crate::core::tree::CommandTree;
use crate::core::value::Value;
use crate::core::xref::CommandXref;
use crate::models::{CmdId, Flag, FlagEvent, FlagHook, FlagId, HookOutcome, NodeRef};
use crate::system::input::{self, InputHelper};

/// The unconsumed part of the token being matched, plus the argv tail a value
/// may be taken from.
#[derive(Debug, Clone, Default)]
pub struct ValuePackage {
    /// Text still to be matched or used as a value.
    pub remains: String,
    /// The argv elements after the current token.
    pub rest: Vec<String>,
    /// How many elements of `rest` were consumed as values.
    pub consumed: usize,
    /// Matching short titles (`-x`, `+x`).
    pub short: bool,
    /// The token used the `~~` prefix.
    pub dbl_tilde: bool,
    /// The token used the `+` prefix.
    pub plus: bool,
    /// The long form carried `=value`.
    pub explicit_value: bool,
    /// The token as typed.
    pub token: String,
}

/// A flag found for the current package.
#[derive(Debug, Clone)]
struct Candidate {
    flag: FlagId,
    title: String,
    remains: String,
    explicit: bool,
    rank: usize,
}

/// Mutable view over everything one parse touches.
pub(crate) struct Session<'a> {
    pub(crate) tree: &'a mut CommandTree,
    pub(crate) ctx: &'a mut ParseContext,
    pub(crate) store: &'a mut Store,
    pub(crate) config: &'a EngineConfig,
    pub(crate) input: &'a dyn InputHelper,
    pub(crate) env: &'a dyn Fn(&str) -> Option<String>,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("command", &self.ctx.command)
            .finish_non_exhaustive()
    }
}

impl Session<'_> {
    // --- Commands ---

    /// Matches `word` against the subcommands of the current command.
    pub(crate) fn match_command(&mut self, word: &str) -> EngineResult<Option<CmdId>> {
        let current = self.ctx.command;
        self.tree.ensure_xref_of(current);

        let indexed = self.tree.xref(current).and_then(|x| {
            x.long_commands
                .get(word)
                .map(|id| (*id, false))
                .or_else(|| x.short_commands.get(word).map(|id| (*id, true)))
        });
        let found = match indexed {
            Some(hit) => Some(hit),
            None => self
                .tree
                .dynamic_subcommands(current)
                .into_iter()
                .find(|&c| self.tree[c].base.has_title(word))
                .map(|c| (c, self.tree[c].base.short == word)),
        };

        let Some((id, short)) = found else {
            log::debug!(
                "'{}' is not a subcommand of '{}'.",
                word,
                self.tree.dotted_path(current)
            );
            return Ok(None);
        };
        self.enter_command(id, word, short).map(Some)
    }

    fn enter_command(&mut self, id: CmdId, hit: &str, short: bool) -> EngineResult<CmdId> {
        self.stamp_command(id, hit, short);

        let hooks = self.tree[id].on_matched.clone();
        for hook in hooks {
            (hook.0)(&self.tree[id], hit)?;
        }

        if let Some(hint) = &self.tree[id].base.deprecated {
            log::warn!(
                "Command '{}' is deprecated: {}",
                self.tree.dotted_path(id),
                hint
            );
        }

        let target = match self.tree[id].redirect_to.clone() {
            Some(path) => {
                let Some(target) = self.tree.find_command_by_path(&path) else {
                    return Err(EngineError::BrokenRedirect {
                        from: self.tree.dotted_path(id),
                        to: path,
                    });
                };
                log::debug!("Redirecting '{}' to '{}'.", self.tree.dotted_path(id), path);
                self.stamp_command(target, hit, short);
                target
            }
            None => id,
        };

        self.ctx.command = target;
        self.ctx.matched_commands.push(target);
        Ok(target)
    }

    fn stamp_command(&mut self, id: CmdId, hit: &str, short: bool) {
        let base = &mut self.tree[id].base;
        base.hit_title = hit.to_string();
        base.hit_times += 1;
        let times = base.hit_times;

        let state = self.ctx.record(NodeRef::Command(id));
        state.short = short;
        state.hit_str = hit.to_string();
        state.hit_times = times;
    }

    // --- Flags ---

    /// Finds and applies the flag at the front of `pkg`. Returns false when
    /// nothing in the command chain matches.
    pub(crate) fn match_flag(&mut self, pkg: &mut ValuePackage) -> EngineResult<bool> {
        let Some(candidate) = self.find_flag(pkg) else {
            return Ok(false);
        };
        log::debug!(
            "Token '{}' matched flag '{}' as '{}'.",
            pkg.token,
            self.tree.flag_path(candidate.flag),
            candidate.title
        );
        pkg.remains = candidate.remains;
        pkg.explicit_value = candidate.explicit;
        self.apply_flag(candidate.flag, &candidate.title, pkg)?;
        Ok(true)
    }

    fn find_flag(&mut self, pkg: &ValuePackage) -> Option<Candidate> {
        let chain: Vec<CmdId> = self.tree.ancestors(self.ctx.command).collect();
        let mut best: Option<Candidate> = None;
        for cmd in chain {
            if let Some(found) = self.lookup_in(cmd, pkg)
                && best.as_ref().is_none_or(|b| found.rank > b.rank)
            {
                best = Some(found);
            }
        }
        best
    }

    fn lookup_in(&mut self, cmd: CmdId, pkg: &ValuePackage) -> Option<Candidate> {
        self.tree.ensure_xref_of(cmd);
        let text = pkg.remains.as_str();

        // `~~`-only flags are skipped outside `~~` form, so a plainer match
        // further down still gets its chance.
        self.tree
            .xref(cmd)
            .and_then(|x| index_lookup(self.tree, x, text, pkg))
            .or_else(|| self.dynamic_lookup(cmd, text, pkg))
            .or_else(|| self.head_like_lookup(cmd, text, pkg))
    }

    fn dynamic_lookup(
        &mut self,
        cmd: CmdId,
        text: &str,
        pkg: &ValuePackage,
    ) -> Option<Candidate> {
        let short = pkg.short;
        let (name, value) = split_long(text, short);
        let ids = self.tree.dynamic_flags(cmd);
        let flag = ids.into_iter().find(|&f| {
            let flag = &self.tree[f];
            let titled = if short { flag.base.short == name } else { flag.base.has_title(name) };
            titled && admits(flag, pkg)
        })?;
        Some(Candidate {
            flag,
            title: name.to_string(),
            remains: value.unwrap_or_default().to_string(),
            explicit: value.is_some(),
            rank: name.len(),
        })
    }

    fn head_like_lookup(&self, cmd: CmdId, text: &str, pkg: &ValuePackage) -> Option<Candidate> {
        if !pkg.short || text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let flag = self
            .tree
            .xref(cmd)?
            .head_like
            .filter(|&f| admits(&self.tree[f], pkg))?;
        Some(Candidate {
            flag,
            title: self.tree[flag].long().to_string(),
            remains: text.to_string(),
            explicit: false,
            rank: 0,
        })
    }

    fn apply_flag(&mut self, fid: FlagId, hit: &str, pkg: &mut ValuePackage) -> EngineResult<()> {
        let times = {
            let base = &mut self.tree[fid].base;
            base.hit_title = hit.to_string();
            base.hit_times += 1;
            base.hit_times
        };
        let state = self.ctx.record(NodeRef::Flag(fid));
        state.short = pkg.short;
        state.dbl_tilde = pkg.dbl_tilde;
        state.plus = pkg.plus;
        state.hit_str = hit.to_string();
        state.hit_times = times;
        self.ctx.matched_flags.push(fid);

        if let Some(builtin) = self.tree[fid].builtin {
            self.ctx.mask.insert(builtin);
        }
        if let Some(hint) = &self.tree[fid].base.deprecated {
            log::warn!("Flag '--{}' is deprecated: {}", self.tree[fid].long(), hint);
        }

        let value = self.extract_value(fid, pkg)?;
        self.check_guards(fid, &value)?;
        self.assign(fid, hit, value)
    }

    // --- Values ---

    fn extract_value(&mut self, fid: FlagId, pkg: &mut ValuePackage) -> EngineResult<Value> {
        let flag = &self.tree[fid];
        let is_string = matches!(flag.default_value, Value::String(_));

        if flag.is_bool() {
            if pkg.explicit_value {
                let on = coerce::parse_bool(&pkg.remains, true);
                pkg.remains.clear();
                return Ok(Value::Bool(on));
            }
            let on = if let Some(rest) = pkg.remains.strip_prefix('+') {
                pkg.remains = rest.to_string();
                true
            } else if let Some(rest) = pkg.remains.strip_prefix('-') {
                pkg.remains = rest.to_string();
                false
            } else {
                true
            };
            return Ok(Value::Bool(on));
        }

        let text = self.take_text(fid, pkg)?;
        if is_string {
            return Ok(Value::String(coerce::strip_quotes(&text).to_string()));
        }

        let flag = &self.tree[fid];
        if let Some(hook) = flag.on_parse_value.clone()
            && let HookOutcome::Handled(value) = (hook.0)(flag, &text)?
        {
            return Ok(value);
        }
        let strictness = if flag.required {
            Strictness::Strict
        } else {
            Strictness::Lenient
        };
        coerce::parse_with(&text, &flag.default_value, strictness).map_err(|source| {
            EngineError::InvalidValue {
                flag: flag.long().to_string(),
                source,
            }
        })
    }

    /// The text of a value: the token's remainder, else the interactive
    /// helper, else the next argv element.
    fn take_text(&mut self, fid: FlagId, pkg: &mut ValuePackage) -> EngineResult<String> {
        if !pkg.remains.is_empty() || pkg.explicit_value {
            return Ok(std::mem::take(&mut pkg.remains));
        }

        let flag = &self.tree[fid];
        if let Some(source) = &flag.external_editor {
            if source == PASSWORD_HELPER {
                let prompt = if flag.base.description.is_empty() {
                    flag.long()
                } else {
                    flag.base.description.as_str()
                };
                return self.input.read_secret(prompt);
            }
            let program = input::editor_program(source, self.env);
            let initial = flag.value.to_string();
            log::debug!("Opening '{}' for flag '--{}'.", program, flag.long());
            return self.input.edit_text(&program, &initial);
        }

        match pkg.rest.get(pkg.consumed) {
            Some(next) => {
                pkg.consumed += 1;
                Ok(next.clone())
            }
            None => Err(EngineError::MissingValue {
                flag: flag.long().to_string(),
            }),
        }
    }

    // --- Guards ---

    fn check_guards(&mut self, fid: FlagId, value: &Value) -> EngineResult<()> {
        let owner = self.tree[fid].owner.unwrap_or(self.tree.root());

        if let Some(group) = self.tree[fid].toggle_group.clone()
            && value == &Value::Bool(true)
        {
            self.toggle(owner, &group, fid);
        }

        for title in self.tree[fid].mutual_exclusives.clone() {
            match self.tree.find_flag_in_chain(owner, &title) {
                Some(other) if other != fid => {
                    let zero = self.tree[other].default_value.zeroed();
                    log::debug!("Clearing '--{}' (exclusive with '--{}').", title, self.tree[fid].long());
                    self.write_value(other, zero);
                }
                Some(_) => {}
                None => log::warn!(
                    "Flag '--{}' lists unknown exclusive '{}'.",
                    self.tree[fid].long(),
                    title
                ),
            }
        }

        for title in &self.tree[fid].prerequisites {
            match self.tree.find_flag_in_chain(owner, title) {
                Some(pre) if !self.ctx.is_set(pre) => {
                    return Err(EngineError::PrerequisiteMissing {
                        flag: self.tree[fid].long().to_string(),
                        missing: self.tree[pre].long().to_string(),
                    });
                }
                Some(_) => {}
                None => log::warn!(
                    "Flag '--{}' lists unknown prerequisite '{}'.",
                    self.tree[fid].long(),
                    title
                ),
            }
        }

        let flag = &self.tree[fid];
        if flag.just_once && flag.base.hit_times > 1 {
            return Err(EngineError::JustOnceViolated {
                flag: flag.long().to_string(),
            });
        }

        if flag.circuit_break {
            log::debug!("Flag '--{}' stops parsing.", flag.long());
            self.ctx.should_stop = true;
            if flag.builtin.is_some() {
                self.ctx.stopped_by_builtin = true;
            }
        }
        Ok(())
    }

    fn toggle(&mut self, owner: CmdId, group: &str, on: FlagId) {
        let members = match self
            .tree
            .xref_mut(owner)
            .and_then(|x| x.toggle_groups.get_mut(group))
        {
            Some(entry) => {
                entry.matched = Some(on);
                entry.members.clone()
            }
            None => return,
        };
        for member in members.into_iter().filter(|m| *m != on) {
            if self.tree[member].value != Value::Bool(false) {
                self.write_value(member, Value::Bool(false));
            }
        }
    }

    // --- Assignment ---

    fn assign(&mut self, fid: FlagId, hit: &str, value: Value) -> EngineResult<()> {
        let flag = &self.tree[fid];
        let old = flag.value.clone();
        let new = if flag.default_value.is_collection() && flag.base.hit_times > 1 {
            old.clone().merged(value)
        } else {
            value
        };

        self.validate(fid, &new)?;

        let flag = &self.tree[fid];
        let event = FlagEvent {
            flag,
            hit,
            old: &old,
            new: &new,
        };
        if let HookOutcome::Fallback = fire(flag.on_matched.as_ref(), &event)? {
            log::debug!("on_matched of '--{}' declined; value left as is.", flag.long());
            return Ok(());
        }
        if let HookOutcome::Fallback = fire(flag.on_changing.as_ref(), &event)? {
            log::debug!("on_changing of '--{}' vetoed the change.", flag.long());
            return Ok(());
        }
        fire(flag.on_set.as_ref(), &event)?;
        if old != new {
            fire(flag.on_changed.as_ref(), &event)?;
        }

        self.ctx.record(NodeRef::Flag(fid)).value = Some(new.clone());
        self.write_value(fid, new);
        Ok(())
    }

    fn validate(&self, fid: FlagId, value: &Value) -> EngineResult<()> {
        let flag = &self.tree[fid];
        let items: Vec<&Value> = match value.as_items() {
            Some(items) => items.iter().collect(),
            None => vec![value],
        };

        if !flag.valid_args.is_empty() {
            for item in &items {
                let text = item.to_string();
                if !flag.valid_args.iter().any(|a| *a == text) {
                    return Err(EngineError::InvalidChoice {
                        flag: flag.long().to_string(),
                        value: text,
                        choices: flag.valid_args.join(", "),
                    });
                }
            }
        }

        if let Some((min, max)) = flag.range {
            for item in &items {
                if let Some(n) = item.as_f64()
                    && !(min..=max).contains(&n)
                {
                    return Err(EngineError::OutOfRange {
                        flag: flag.long().to_string(),
                        value: item.to_string(),
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Writes the node and the store.
    pub(crate) fn write_value(&mut self, fid: FlagId, value: Value) {
        let path = self.tree.flag_path(fid);
        self.store.set(&path, value.clone());
        self.tree[fid].value = value;
    }
}

fn fire(hook: Option<&FlagHook>, event: &FlagEvent<'_>) -> EngineResult<HookOutcome<()>> {
    match hook {
        Some(h) => (h.0)(event),
        None => Ok(HookOutcome::Handled(())),
    }
}

/// Splits `name=value` in long mode.
fn split_long(text: &str, short: bool) -> (&str, Option<&str>) {
    if short {
        return (text, None);
    }
    match text.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (text, None),
    }
}

/// Exact then partial-prefix lookup in one command's index.
/// Whether `flag` may match a token of `pkg`'s form. `dbl_tilde_only` flags
/// need the `~~` prefix.
fn admits(flag: &Flag, pkg: &ValuePackage) -> bool {
    pkg.dbl_tilde || !flag.dbl_tilde_only
}

fn index_lookup(
    tree: &CommandTree,
    xref: &CommandXref,
    text: &str,
    pkg: &ValuePackage,
) -> Option<Candidate> {
    let short = pkg.short;
    let (name, value) = split_long(text, short);
    let map = if short { &xref.short_flags } else { &xref.long_flags };

    if let Some(&flag) = map.get(name).filter(|&&f| admits(&tree[f], pkg)) {
        return Some(Candidate {
            flag,
            title: name.to_string(),
            remains: value.unwrap_or_default().to_string(),
            explicit: value.is_some(),
            rank: name.len(),
        });
    }

    let (key, flag) = CommandXref::longest_prefix(map, text, |f| admits(&tree[f], pkg))?;
    // `--verbosex` must not read as `--verbose` plus garbage.
    if !short && tree[flag].is_bool() {
        return None;
    }
    let suffix = text.get(key.len()..).unwrap_or_default();
    let (remains, explicit) = match suffix.strip_prefix('=') {
        Some(v) => (v, true),
        None => (suffix, false),
    };
    Some(Candidate {
        flag,
        title: key.to_string(),
        remains: remains.to_string(),
        explicit,
        rank: key.len(),
    })
}
