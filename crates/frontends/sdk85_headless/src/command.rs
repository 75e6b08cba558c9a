/*
    SDK-85 Emulator
    A peripheral-level emulator of the SDK-85 8085 trainer

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    command.rs

    Line commands accepted by the headless command loop.

*/

use std::{path::PathBuf, str::FromStr};

use sdk85_core::machine_types::BoardMode;

use crate::keypad::KeypadKey;

pub const HELP_TEXT: &str = "\
commands:
  key <key> [<key> ...]   press keypad keys (0-F, GO, NEXT, EXEC, SUBST, EXAM, STEP, VECT, RESET)
  type <text>             send text down the teletype line (a trailing newline is sent as CR)
  reset                   reset the board
  mode <keypad|tty>       switch console and reset
  load <file> [address]   load a binary image into RAM (hex address) and reset
  show                    print the display and machine state
  tty                     print everything the board has sent to the teletype
  ports                   list the IO ports
  help                    this text
  quit                    exit";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Keys(Vec<KeypadKey>),
    Type(String),
    Reset,
    Mode(BoardMode),
    Load(PathBuf, Option<u16>),
    Show,
    Transcript,
    Ports,
    Help,
    Quit,
    Nothing,
}

impl FromStr for Command {
    type Err = String;
    fn from_str(line: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        let line = line.trim_start();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match verb.to_lowercase().as_str() {
            "" => Ok(Command::Nothing),
            "key" | "k" => {
                let keys = rest
                    .split_whitespace()
                    .map(str::parse::<KeypadKey>)
                    .collect::<Result<Vec<_>, _>>()?;
                if keys.is_empty() {
                    return Err("key: no keys given".to_string());
                }
                Ok(Command::Keys(keys))
            }
            "type" | "t" => {
                let mut text = rest.to_string();
                text.push('\n');
                Ok(Command::Type(text))
            }
            "reset" => Ok(Command::Reset),
            "mode" => rest.trim().parse::<BoardMode>().map(Command::Mode),
            "load" => {
                let mut args = rest.split_whitespace();
                let path = args.next().ok_or("load: no file given")?;
                let address = args
                    .next()
                    .map(|a| sdk85_config::parse_hex_u16(a).map_err(|e| format!("load: bad address '{}': {}", a, e)))
                    .transpose()?;
                Ok(Command::Load(PathBuf::from(path), address))
            }
            "show" | "s" => Ok(Command::Show),
            "tty" => Ok(Command::Transcript),
            "ports" => Ok(Command::Ports),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => Err(format!("Unknown command: {}", verb)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(
            "key 1 2 go".parse::<Command>(),
            Ok(Command::Keys(vec![KeypadKey::Hex(1), KeypadKey::Hex(2), KeypadKey::Go]))
        );
        assert_eq!("type d0,10".parse::<Command>(), Ok(Command::Type("d0,10\n".to_string())));
        assert_eq!("MODE tty".parse::<Command>(), Ok(Command::Mode(BoardMode::Tty)));
        assert_eq!(
            "load prog.bin 2000".parse::<Command>(),
            Ok(Command::Load(PathBuf::from("prog.bin"), Some(0x2000)))
        );
        assert_eq!(
            "load prog.bin".parse::<Command>(),
            Ok(Command::Load(PathBuf::from("prog.bin"), None))
        );
        assert_eq!("   ".parse::<Command>(), Ok(Command::Nothing));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn reject_bad_commands() {
        assert!("key".parse::<Command>().is_err());
        assert!("key 1 X".parse::<Command>().is_err());
        assert!("mode printer".parse::<Command>().is_err());
        assert!("load".parse::<Command>().is_err());
        assert!("load a.bin qq".parse::<Command>().is_err());
        assert!("launch".parse::<Command>().is_err());
    }
}
