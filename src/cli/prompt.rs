//! Interactive prompt for registering scheduling events.
//!
//! Reads one entry at a time: OID, event mode, a timeout when the mode is
//! AUTO, then commands until a blank line commits the entry. The literal
//! `QUIT` at the OID or mode prompt ends the session; entries already
//! committed stay committed.

use crate::error::Error;
use crate::mib::MibTable;
use crate::oid::Oid;
use crate::scheduler::{Event, EventMode, Scheduler};
use crate::store::Store;
use std::io::{BufRead, Write};

pub fn run_schedule_prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    store: &Store,
    mib: &MibTable,
    scheduler: &mut Scheduler,
) -> std::io::Result<()> {
    writeln!(output, "mibward scheduler CLI")?;
    writeln!(output, "Type QUIT to exit")?;

    loop {
        write!(output, "OID: ")?;
        output.flush()?;
        let Some(oid_line) = read_trimmed(input)? else {
            break;
        };
        if oid_line == "QUIT" {
            writeln!(output, "Scheduling saved! Bye bye!")?;
            break;
        }
        let oid = match Oid::parse(&oid_line) {
            Ok(oid) => oid,
            Err(_) => {
                writeln!(output, "Invalid OID")?;
                continue;
            }
        };

        write!(output, "Event mode [GET/SET/AUTO/INIT]: ")?;
        output.flush()?;
        let Some(mode_line) = read_trimmed(input)? else {
            break;
        };
        if mode_line == "QUIT" {
            writeln!(output, "Scheduling saved! Bye bye!")?;
            break;
        }
        let Some(mode) = EventMode::parse(&mode_line) else {
            writeln!(output, "Invalid Event mode")?;
            continue;
        };

        let mut timeout = 0u64;
        if mode == EventMode::Auto {
            write!(output, "Set timeout for scheduled event: ")?;
            output.flush()?;
            let Some(timeout_line) = read_trimmed(input)? else {
                break;
            };
            timeout = match timeout_line.parse() {
                Ok(t) if t > 0 => t,
                _ => {
                    writeln!(output, "Invalid timeout")?;
                    continue;
                }
            };
        }

        writeln!(
            output,
            "Set command list to execute; press ENTER (without typing anything else) to commit scheduling"
        )?;
        let mut commands = Vec::new();
        loop {
            write!(output, ">> ")?;
            output.flush()?;
            match read_trimmed(input)? {
                None => break,
                Some(command) if command.is_empty() => break,
                Some(command) => commands.push(command),
            }
        }

        match commit(store, mib, scheduler, oid, mode, timeout, commands) {
            Ok(()) => writeln!(output, "Scheduling entry saved successfully")?,
            Err(e) => writeln!(output, "Scheduling entry refused: {e}")?,
        }
    }

    Ok(())
}

fn commit(
    store: &Store,
    mib: &MibTable,
    scheduler: &mut Scheduler,
    oid: Oid,
    mode: EventMode,
    timeout: u64,
    commands: Vec<String>,
) -> crate::error::Result<()> {
    // GET/SET/INIT triggers only ever fire through an existing entry
    if mode != EventMode::Auto && mib.get(&oid).is_none() {
        return Err(Error::NotFound(oid.to_string()));
    }
    scheduler.add(
        store,
        Event {
            oid,
            mode,
            timeout,
            commands,
        },
    )
}

/// Read one line, trimmed. `None` means end of input.
fn read_trimmed<R: BufRead>(input: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mib::{AccessMode, MibEntry};
    use crate::oid;
    use crate::value::TypeTag;
    use std::io::Cursor;

    fn fixture() -> (Store, MibTable) {
        let store = Store::open_in_memory().unwrap();
        let mut mib = MibTable::new();
        mib.add(
            &store,
            MibEntry::new(
                oid!(1, 3, 6, 1),
                TypeTag::Integer,
                "5",
                AccessMode::ReadWrite,
                "sysTest",
            )
            .unwrap(),
        )
        .unwrap();
        (store, mib)
    }

    fn drive(session: &str, store: &Store, mib: &MibTable, scheduler: &mut Scheduler) -> String {
        let mut input = Cursor::new(session.as_bytes().to_vec());
        let mut output = Vec::new();
        run_schedule_prompt(&mut input, &mut output, store, mib, scheduler).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_commit_entry_then_quit() {
        let (store, mib) = fixture();
        let mut scheduler = Scheduler::new();

        let output = drive(
            "1.3.6.1\nGET\necho hello\necho world\n\nQUIT\n",
            &store,
            &mib,
            &mut scheduler,
        );

        assert!(output.contains("Scheduling entry saved successfully"));
        assert!(output.contains("Scheduling saved! Bye bye!"));
        let event = scheduler.get(&oid!(1, 3, 6, 1), EventMode::Get).unwrap();
        assert_eq!(event.commands, vec!["echo hello", "echo world"]);
    }

    #[test]
    fn test_auto_asks_for_timeout() {
        let (store, mib) = fixture();
        let mut scheduler = Scheduler::new();

        let output = drive(
            "1.3.6.9\nAUTO\n30\n/usr/bin/poll\n\nQUIT\n",
            &store,
            &mib,
            &mut scheduler,
        );

        assert!(output.contains("Set timeout for scheduled event: "));
        assert!(output.contains("Scheduling entry saved successfully"));
        let event = scheduler.get(&oid!(1, 3, 6, 9), EventMode::Auto).unwrap();
        assert_eq!(event.timeout, 30);
    }

    #[test]
    fn test_invalid_mode_retries() {
        let (store, mib) = fixture();
        let mut scheduler = Scheduler::new();

        let output = drive("1.3.6.1\nBOGUS\nQUIT\n", &store, &mib, &mut scheduler);

        assert!(output.contains("Invalid Event mode"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_get_event_requires_existing_oid() {
        let (store, mib) = fixture();
        let mut scheduler = Scheduler::new();

        let output = drive(
            "9.9.9\nGET\necho nope\n\nQUIT\n",
            &store,
            &mib,
            &mut scheduler,
        );

        assert!(output.contains("Scheduling entry refused"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_eof_ends_session() {
        let (store, mib) = fixture();
        let mut scheduler = Scheduler::new();
        // input ends mid-session without QUIT
        let output = drive("1.3.6.1\n", &store, &mib, &mut scheduler);
        assert!(output.contains("Event mode"));
        assert!(scheduler.is_empty());
    }
}
