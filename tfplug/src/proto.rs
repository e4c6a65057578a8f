//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! The code is generated at build time from `proto/tfplugin6.proto`. Several
//! generated messages share names with framework types (`Schema`,
//! `Diagnostic`, `DynamicValue`), so refer to them through this module.

pub mod tfplugin6 {
    tonic::include_proto!("tfplugin6");
}
