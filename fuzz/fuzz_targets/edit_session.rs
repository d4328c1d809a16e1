#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;

use crate::common::{
  run,
  session_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let (mut doc, commands) = session_from_bytes(data);
  for command in &commands {
    run(&mut doc, command);
  }
});
