//! Interactive REPL and batch-reader front end, grounded in
//! `kv-cli/src/session.rs`'s `Session`, trimmed to synchronous execution
//! over single-line commands -- there is no SQL statement to accumulate
//! across lines, so the semicolon/comment-block buffering in the upstream
//! `Session` drops out entirely, and each line runs as its own command.

use std::io::BufRead;

use rustyline::config::Builder;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Editor};

use txkv::storage::engine::Engine;
use txkv::txn::manager::Manager;

use crate::command;
use crate::config::ConfigLoad;
use crate::rusty::CliHelper;

pub struct Session<E: Engine> {
    manager: Manager<E>,
    settings: ConfigLoad,
}

impl<E: Engine> Session<E> {
    pub fn new(manager: Manager<E>, settings: ConfigLoad) -> Self {
        Session { manager, settings }
    }

    pub fn handle_repl(&mut self) {
        println!("Welcome to txkv-cli.");
        println!();

        let config = Builder::new().completion_prompt_limit(5).completion_type(CompletionType::Circular).build();
        let mut rl = Editor::<CliHelper, DefaultHistory>::with_config(config).unwrap();
        rl.set_helper(Some(CliHelper::new()));
        rl.load_history(&get_history_path()).ok();

        loop {
            match rl.readline(&self.settings.prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);
                    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                        break;
                    }
                    self.run_one(line);
                }
                Err(ReadlineError::Io(err)) => eprintln!("io err: {err}"),
                Err(ReadlineError::Interrupted) => println!("^C"),
                Err(ReadlineError::Eof) => break,
                Err(_) => {}
            }
        }

        println!("Bye~");
        let _ = rl.save_history(&get_history_path());
    }

    pub fn handle_reader<R: BufRead>(&mut self, r: R) -> anyhow::Result<()> {
        let mut pending = String::new();
        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || (pending.is_empty() && line.starts_with('#')) {
                continue;
            }

            if self.settings.multi_line {
                if let Some(head) = line.strip_suffix('\\') {
                    if !pending.is_empty() {
                        pending.push(' ');
                    }
                    pending.push_str(head.trim_end());
                    continue;
                }
            }

            if pending.is_empty() {
                self.run_one(line);
            } else {
                pending.push(' ');
                pending.push_str(line);
                self.run_one(&pending);
                pending.clear();
            }
        }
        if !pending.is_empty() {
            self.run_one(&pending);
        }
        Ok(())
    }

    fn run_one(&mut self, line: &str) {
        let start = std::time::Instant::now();
        match command::execute(&self.manager, line) {
            Ok(output) => println!("{output}"),
            Err(err) => eprintln!("error: {err}"),
        }
        if self.settings.show_stats {
            println!("({:.3}s)", start.elapsed().as_secs_f64());
        }
    }
}

fn get_history_path() -> String {
    format!("{}/.txkv_cli_history", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}
