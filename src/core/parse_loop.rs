// src/core/parse_loop.rs

//! Single left-to-right scan of argv.
//!
//! | token            | meaning                                        |
//! |------------------|------------------------------------------------|
//! | `--`             | everything after is positional                 |
//! | `+x`             | short flag, `true` bias                        |
//! | `--x`, `~~x`     | long flag (`~~` unlocks tilde-only flags)      |
//! | `-`, `~`, `-~x`  | anomalous, skipped                             |
//! | `-xyz`           | short flag bundle                              |
//! | anything else    | subcommand, or positional                      |

use crate::core::errors::{EngineError, EngineResult};
use crate::core::matcher::{Session, ValuePackage};

/// How a flag token was introduced.
#[derive(Debug, Clone, Copy)]
struct FlagForm {
    short: bool,
    dbl_tilde: bool,
    plus: bool,
}

impl Session<'_> {
    /// Consumes `args` (argv without the program name).
    pub(crate) fn scan(&mut self, args: &[String]) -> EngineResult<()> {
        let mut i = 0;
        while let Some(token) = args.get(i) {
            if self.ctx.should_stop {
                log::debug!("Parsing stopped before '{}'.", token);
                break;
            }
            i += 1;
            if self.ctx.pass_through.is_set() {
                self.ctx.positional.push(token.clone());
                continue;
            }
            let rest = args.get(i..).unwrap_or_default();
            i += self.scan_token(token, rest)?;
        }
        Ok(())
    }

    /// Handles one token; returns how many following args it consumed.
    fn scan_token(&mut self, token: &str, rest: &[String]) -> EngineResult<usize> {
        if token == "--" {
            if self.ctx.pass_through.set_once() {
                log::debug!("'--' seen; remaining arguments are positional.");
            }
            return Ok(0);
        }

        if token == "-" || token == "~" || token.starts_with("-~") || token.starts_with("~-") {
            self.ctx.stray.set_once();
            self.ctx.anomalies.push(token.to_string());
            log::warn!("Ignoring stray token '{}'.", token);
            return Ok(0);
        }

        if let Some(body) = token.strip_prefix("--") {
            let form = FlagForm { short: false, dbl_tilde: false, plus: false };
            return self.scan_flag(token, body, form, rest);
        }
        if let Some(body) = token.strip_prefix("~~") {
            let form = FlagForm { short: false, dbl_tilde: true, plus: false };
            return self.scan_flag(token, body, form, rest);
        }
        if let Some(body) = token.strip_prefix('-') {
            let form = FlagForm { short: true, dbl_tilde: false, plus: false };
            return self.scan_flag(token, body, form, rest);
        }
        if let Some(body) = token.strip_prefix('+')
            && !body.is_empty()
        {
            let form = FlagForm { short: true, dbl_tilde: false, plus: true };
            return self.scan_flag(token, body, form, rest);
        }

        self.scan_word(token)?;
        Ok(0)
    }

    fn scan_flag(
        &mut self,
        token: &str,
        body: &str,
        form: FlagForm,
        rest: &[String],
    ) -> EngineResult<usize> {
        if body.is_empty() {
            self.ctx.anomalies.push(token.to_string());
            log::warn!("Ignoring empty flag token '{}'.", token);
            return Ok(0);
        }

        let mut pkg = ValuePackage {
            remains: body.to_string(),
            rest: rest.to_vec(),
            short: form.short,
            dbl_tilde: form.dbl_tilde,
            plus: form.plus,
            token: token.to_string(),
            ..ValuePackage::default()
        };

        let mut first = true;
        loop {
            if !self.match_flag(&mut pkg)? {
                let unknown = match (first, form.plus) {
                    (true, _) => token.to_string(),
                    (false, true) => format!("+{}", pkg.remains),
                    (false, false) => format!("-{}", pkg.remains),
                };
                self.unmatched_flag(unknown)?;
                break;
            }
            first = false;
            // Only short bundles re-enter matching on the remainder.
            if pkg.remains.is_empty() || self.ctx.should_stop || !pkg.short {
                break;
            }
        }
        Ok(pkg.consumed)
    }

    fn unmatched_flag(&mut self, token: String) -> EngineResult<()> {
        if self.config.unmatched_as_error {
            return Err(EngineError::UnmatchedFlag { token });
        }
        log::warn!("Unknown flag '{}' kept as a positional argument.", token);
        self.ctx.unknown_flags.push(token.clone());
        self.ctx.positional.push(token);
        Ok(())
    }

    fn scan_word(&mut self, token: &str) -> EngineResult<()> {
        let current = self.ctx.command;
        if token.starts_with('~')
            || self.tree.is_leaf(current)
            || self.ctx.unmatched.is_set()
        {
            self.ctx.positional.push(token.to_string());
            return Ok(());
        }

        if self.match_command(token)?.is_some() {
            return Ok(());
        }

        if self.config.unmatched_as_error {
            return Err(EngineError::UnmatchedCommand {
                token: token.to_string(),
                parent: self.tree.dotted_path(current),
            });
        }
        if self.ctx.unmatched.set_once() {
            log::debug!(
                "'{}' is not a command of '{}'; remaining words are positional.",
                token,
                self.tree.dotted_path(current)
            );
        }
        self.ctx.positional.push(token.to_string());
        Ok(())
    }
}
