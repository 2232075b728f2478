//! Backend commands queued from UI to backend worker.

use client_core::Mutation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Mutate(Mutation),
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Mutate(Mutation::Create { .. }) => "create",
            BackendCommand::Mutate(Mutation::SetDone { .. }) => "set_done",
            BackendCommand::Mutate(Mutation::Delete { .. }) => "delete",
            BackendCommand::Mutate(Mutation::DeleteAll) => "delete_all",
        }
    }
}
