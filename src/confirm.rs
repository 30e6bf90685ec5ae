/// The Yes/No toggle guarding a kill. Every new confirmation starts at `Yes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmChoice {
    #[default]
    Yes,
    No,
}

impl ConfirmChoice {
    /// Moves toward "No, take me back".
    pub fn advance(self) -> Self {
        ConfirmChoice::No
    }

    /// Moves toward "Yes".
    pub fn retreat(self) -> Self {
        ConfirmChoice::Yes
    }

    pub fn toggle(self) -> Self {
        match self {
            ConfirmChoice::Yes => ConfirmChoice::No,
            ConfirmChoice::No => ConfirmChoice::Yes,
        }
    }

    pub fn is_yes(self) -> bool {
        self == ConfirmChoice::Yes
    }
}
