//! Numeric result codes returned by XM firmware in the `Ret` field.
//!
//! Operators know these codes by their stock descriptions, so the strings
//! below are reproduced verbatim, typos included.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `Ret` code reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub u32);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(100);
    pub const SUCCESS_RESTART_REQUIRED: ResultCode = ResultCode(150);
    pub const INCORRECT_PASSWORD: ResultCode = ResultCode(203);
    pub const ILLEGAL_PASSWORD: ResultCode = ResultCode(214);

    /// Returns the stock description, or `None` for codes outside the table.
    pub fn description(self) -> Option<&'static str> {
        CODES
            .binary_search_by_key(&self.0, |&(code, _)| code)
            .ok()
            .map(|idx| CODES[idx].1)
    }

    /// `true` for codes that mean the device accepted the request.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS || self == Self::SUCCESS_RESTART_REQUIRED
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => f.write_str(text),
            None => write!(f, "Unknown result code {}", self.0),
        }
    }
}

/// Code table, sorted by code.
const CODES: &[(u32, &str)] = &[
    (100, "Success"),
    (101, "Unknown error"),
    (102, "Version not supported"),
    (103, "Illegal request"),
    (104, "User has already logged in"),
    (105, "User is not logged in"),
    (106, "Username or Password is incorrect"),
    (107, "Insufficient permission"),
    (108, "Timeout"),
    (109, "Find failed, file not found"),
    (110, "Find success, returned all files"),
    (111, "Find success, returned part of files"),
    (112, "User already exists"),
    (113, "User does not exist"),
    (114, "User group already exists"),
    (115, "User group does not exist"),
    (116, "Reserved"),
    (117, "Message is malformed"),
    (118, "No PTZ protocol is set"),
    (119, "No query to file"),
    (120, "Configured to be enabled"),
    (121, "Digital channel is not enabled"),
    (150, "Success, camera restart required"),
    (202, "User is not logged in"),
    (203, "Incorrect password"),
    (204, "User is illegal"),
    (205, "User is locked"),
    (206, "User is in the blacklist"),
    (207, "User already logged in"),
    (208, "Invalid input"),
    (209, "User already exists"),
    (210, "Object not found"),
    (211, "Object does not exist"),
    (212, "Account in use"),
    (213, "Permission table error"),
    (214, "Illegal password"),
    (215, "Password does not match"),
    (216, "Keep account number"),
    (502, "Illegal command"),
    (503, "Talk channel has ben opened"),
    (504, "Talk channel is not open"),
    (511, "Update started"),
    (512, "Update did not start"),
    (513, "Update data error"),
    (514, "Update failed"),
    (515, "Update succeeded"),
    (521, "Failed to restore default config"),
    (522, "Camera restart required"),
    (523, "Default config is illegal"),
    (602, "Application restart required"),
    (603, "System restart required"),
    (604, "Write file error"),
    (605, "Features are not supported"),
    (606, "Verification failed"),
    (607, "Configuration does not exist"),
    (608, "Configuration parsing error"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_for_binary_search() {
        assert!(CODES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_known_descriptions() {
        assert_eq!(ResultCode(100).to_string(), "Success");
        assert_eq!(ResultCode(203).to_string(), "Incorrect password");
        assert_eq!(ResultCode(214).to_string(), "Illegal password");
        assert_eq!(ResultCode(608).to_string(), "Configuration parsing error");
    }

    #[test]
    fn test_unknown_code_display() {
        assert_eq!(ResultCode(999).description(), None);
        assert_eq!(ResultCode(999).to_string(), "Unknown result code 999");
    }

    #[test]
    fn test_success_codes() {
        assert!(ResultCode::SUCCESS.is_success());
        assert!(ResultCode(150).is_success());
        assert!(!ResultCode::INCORRECT_PASSWORD.is_success());
    }

    #[test]
    fn test_serde_is_a_bare_integer() {
        assert_eq!(serde_json::to_string(&ResultCode(203)).unwrap(), "203");
        let code: ResultCode = serde_json::from_str("100").unwrap();
        assert_eq!(code, ResultCode::SUCCESS);
    }
}
