use alloy_primitives::{hex, keccak256, Selector};
use clap::Parser;
use mega_proxy::selector_of;

use crate::{print_output, Error};

/// Print the selector of a function signature or of call data
#[derive(Parser, Debug)]
pub struct Cmd {
    /// A function signature such as `transfer(address,uint256)`, or `0x`-prefixed call data
    pub input: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cmd {
    /// Execute the selector command
    pub fn run(&self) -> Result<(), Error> {
        let selector = self.selector()?;
        print_output(self.json, &selector, || selector.to_string())
    }

    /// Computes the selector without printing it.
    pub fn selector(&self) -> Result<Selector, Error> {
        let input = self.input.trim();
        if let Some(data) = input.strip_prefix("0x") {
            let data = hex::decode(data)
                .map_err(|e| Error::InvalidInput(format!("invalid call data: {e}")))?;
            return Ok(selector_of(&data));
        }
        if !input.contains('(') || !input.ends_with(')') {
            return Err(Error::InvalidInput(format!("not a function signature: {input}")));
        }
        Ok(selector_of(keccak256(input.as_bytes()).as_slice()))
    }
}
