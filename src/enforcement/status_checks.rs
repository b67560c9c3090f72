use crate::database::models::UserSignature;
use crate::github::types::{CommitState, CommitStatus, PullRequestCommit};

/// GitHub rejects status descriptions longer than this.
const MAX_DESCRIPTION_LEN: usize = 140;

pub struct StatusCheckGenerator;

impl StatusCheckGenerator {
    fn status(state: CommitState, description: &str, context: &str, target_url: Option<&str>) -> CommitStatus {
        CommitStatus {
            state,
            description: description.chars().take(MAX_DESCRIPTION_LEN).collect(),
            context: context.to_string(),
            target_url: target_url.map(str::to_string),
        }
    }

    pub fn pending(context: &str) -> CommitStatus {
        Self::status(
            CommitState::Pending,
            "Checking that every commit author has signed the CLA",
            context,
            None,
        )
    }

    pub fn quality_failure(context: &str) -> CommitStatus {
        Self::status(
            CommitState::Failure,
            "One or more commits are missing author information or a verified signature",
            context,
            None,
        )
    }

    pub fn signatures_missing(context: &str, sign_url: &str) -> CommitStatus {
        Self::status(
            CommitState::Failure,
            "One or more commit authors need to sign the CLA",
            context,
            Some(sign_url),
        )
    }

    pub fn all_signed(context: &str) -> CommitStatus {
        Self::status(
            CommitState::Success,
            "Every commit author has signed the CLA",
            context,
            None,
        )
    }

    /// One comment covering every offending commit, missing authors first.
    pub fn quality_comment(missing_author: &[PullRequestCommit], missing_verification: &[PullRequestCommit]) -> String {
        let mut body = String::from(
            "Thanks for the contribution. Unfortunately some of your commits don't meet our standards. \
             All commits must be signed and have author information set.\n\n\
             The commits to review are:\n\n",
        );

        for commit in missing_author {
            body.push_str(&format!(
                "- [{}]({}) - missing author :cop:\n",
                short_sha(&commit.sha),
                commit.html_url
            ));
        }
        for commit in missing_verification {
            body.push_str(&format!(
                "- [{}]({}) - unsigned commit :key:\n",
                short_sha(&commit.sha),
                commit.html_url
            ));
        }

        body.push_str("\nPlease fix these commits and push again; the check will re-run automatically.");
        body
    }

    /// Mentions each user who still has to sign. Deterministic for a given
    /// set of users so repeated evaluations produce an identical body.
    pub fn signatures_missing_comment(users: &[UserSignature], cla_version: &str, sign_url: &str) -> String {
        let mut body = format!(
            "Thanks for the contribution. Before we can merge this, we need every commit author \
             to sign our Contributor License Agreement (version {}).\n\n",
            cla_version
        );

        for user in users {
            body.push_str(&format!(
                "- @{}, please [sign the Contributor License Agreement]({})\n",
                user.login, sign_url
            ));
        }

        body.push_str("\nThis check runs again automatically once the agreement is signed.");
        body
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
