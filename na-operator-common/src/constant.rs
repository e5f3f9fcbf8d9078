// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

pub const APP_NAME: &str = "node-agent-operator";
pub const ENV_PREFIX: &str = "NODE_AGENT_OPERATOR";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
