// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

#[allow(unused_extern_crates)]
extern crate self as na_operator_builder;

pub mod builder;
pub mod crd;
pub mod error;
