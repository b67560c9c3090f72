use crate::github::types::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSpec {
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

impl LabelSpec {
    pub fn to_label(&self) -> Label {
        Label {
            name: self.name.to_string(),
            color: self.color.to_string(),
            description: Some(self.description.to_string()),
        }
    }
}

pub const CLA_NOT_SIGNED: LabelSpec = LabelSpec {
    name: "CLA Not Signed",
    color: "d93f0b",
    description: "At least one commit author has not signed the CLA",
};

pub const CLA_SIGNED: LabelSpec = LabelSpec {
    name: "CLA Signed",
    color: "0e8a16",
    description: "Every commit author has signed the CLA",
};

pub const MISSING_AUTHOR: LabelSpec = LabelSpec {
    name: "Missing Commit Author",
    color: "fbca04",
    description: "At least one commit is not linked to a GitHub account",
};

pub const MISSING_VERIFICATION: LabelSpec = LabelSpec {
    name: "Missing Commit Verification",
    color: "fbca04",
    description: "At least one commit is not signed with a verified key",
};
