use crate::serializer::{build, Comma, Param, ToSql};

use formwork_core::{Parameter, Statement};

/// `call <name>(:p1, :p2, ...)`. Output parameters are marked on the bind.
pub fn proc(name: &str, params: &[Parameter]) -> Statement {
    build(|f| fmt!(f, "call " name "(" Comma(params.iter().cloned().map(Param)) ")"))
}
