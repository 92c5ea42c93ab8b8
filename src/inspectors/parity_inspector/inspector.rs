//! REVM Inspector implementation for Parity call traces
//!
//! Maps revm's frame hooks onto the call-tree builder:
//! - `call` / `create` open a record (the first frame starts the execution)
//! - `call_end` / `create_end` close it (the first frame finishes it)
//! - `selfdestruct` records a closed `suicide` entry
//!
//! Special cases:
//! - Delegate calls and callcode report the executing contract as `from`
//!   and the code address as `to`
//! - Contract creations learn their address only in `create_end`

use crate::inspectors::parity_inspector::ParityInspector;
use crate::types::*;
use crate::utils::error_utils::revert_message;
use revm::{
    context_interface::{result::HaltReason, Block, ContextTr},
    interpreter::{
        CallInputs, CallOutcome, CreateInputs, CreateOutcome, InstructionResult,
        InterpreterTypes, SuccessOrHalt,
    },
    Inspector,
};

impl<CTX, INTR> Inspector<CTX, INTR> for ParityInspector
where
    CTX: ContextTr,
    INTR: InterpreterTypes,
{
    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        let (from, to) = match inputs.scheme {
            CallScheme::DelegateCall | CallScheme::CallCode => {
                (inputs.target_address, inputs.bytecode_address)
            }
            _ => (inputs.caller, inputs.target_address),
        };
        let input = inputs.input.bytes(context);

        self.on_enter(
            context.block().number(),
            CallOperation::from(inputs.scheme),
            from,
            to,
            &input,
            inputs.gas_limit,
            inputs.transfer_value(),
        );
        None
    }

    fn create(&mut self, context: &mut CTX, inputs: &mut CreateInputs) -> Option<CreateOutcome> {
        // The created address is patched in create_end
        self.on_enter(
            context.block().number(),
            CallOperation::from(&inputs.scheme),
            inputs.caller,
            Address::ZERO,
            &inputs.init_code,
            inputs.gas_limit,
            Some(inputs.value),
        );
        None
    }

    fn call_end(&mut self, _context: &mut CTX, _inputs: &CallInputs, outcome: &mut CallOutcome) {
        let result = &outcome.result;
        self.on_exit(
            &result.output,
            result.gas.spent(),
            call_error(result.result, &result.output),
        );
    }

    fn create_end(
        &mut self,
        _context: &mut CTX,
        _inputs: &CreateInputs,
        outcome: &mut CreateOutcome,
    ) {
        if let Some(address) = outcome.address {
            self.builder.set_current_to(address);
        }
        let result = &outcome.result;
        self.on_exit(
            &result.output,
            result.gas.spent(),
            call_error(result.result, &result.output),
        );
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        self.on_selfdestruct(contract, target, value);
    }
}

/// Error carried by a record whose call ended with `result`
fn call_error(result: InstructionResult, output: &[u8]) -> Option<CallError> {
    match SuccessOrHalt::<HaltReason>::from(result) {
        SuccessOrHalt::Success(_) | SuccessOrHalt::Internal(_) => None,
        SuccessOrHalt::Revert => Some(CallError::revert(revert_message(output))),
        SuccessOrHalt::Halt(reason) => Some(CallError::halt(halt_message(&reason))),
        SuccessOrHalt::FatalExternalError => Some(CallError::new(
            CallErrorKind::Fatal,
            "fatal external error",
        )),
    }
}

fn halt_message(reason: &HaltReason) -> String {
    match reason {
        HaltReason::OutOfGas(_) => "out of gas".to_string(),
        HaltReason::OpcodeNotFound | HaltReason::InvalidFEOpcode => "invalid opcode".to_string(),
        HaltReason::InvalidJump => "invalid jump destination".to_string(),
        HaltReason::StackUnderflow => "stack underflow".to_string(),
        HaltReason::StackOverflow => "stack limit reached".to_string(),
        HaltReason::CallTooDeep => "max call depth exceeded".to_string(),
        HaltReason::OutOfFunds => "insufficient balance for transfer".to_string(),
        HaltReason::CreateCollision => "contract address collision".to_string(),
        HaltReason::StateChangeDuringStaticCall => "write protection".to_string(),
        other => format!("{other:?}"),
    }
}
