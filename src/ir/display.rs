//! Textual rendering of expressions and statements in VEX's pretty-printer format

use std::fmt;

use super::enums::Effect;
use super::expr::Expr;
use super::stmt::{
    AbiHint, Cas, Dirty, Exit, IMark, Llsc, LlscOp, Mbe, NoOp, Put, PutI, Stmt, Store,
    UnknownStmt, WrTmp,
};

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", expr)?;
    }
    Ok(())
}

fn effect_abbrev(fx: Effect) -> &'static str {
    match fx {
        Effect::None => "--",
        Effect::Read => "RdFX",
        Effect::Write => "WrFX",
        Effect::Modify => "MoFX",
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Get { offset, ty } => write!(f, "GET:{}({})", ty.short_name(), offset),
            Expr::GetI { descr, ix, bias } => write!(f, "GETI{}[{},{}]", descr, ix, bias),
            Expr::RdTmp(tmp) => write!(f, "{}", tmp),
            Expr::Binop { op, arg1, arg2 } => write!(f, "{}({},{})", op.short_name(), arg1, arg2),
            Expr::Unop { op, arg } => write!(f, "{}({})", op.short_name(), arg),
            Expr::Load { end, ty, addr } => {
                write!(f, "LD{}:{}({})", end.suffix(), ty.short_name(), addr)
            }
            Expr::Const(value) => write!(f, "{}", value),
            Expr::Ite {
                cond,
                iftrue,
                iffalse,
            } => write!(f, "ITE({},{},{})", cond, iftrue, iffalse),
            Expr::CCall {
                callee,
                ret_ty,
                args,
            } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                write!(f, "):{}", ret_ty.short_name())
            }
        }
    }
}

impl fmt::Display for NoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IR-NoOp")
    }
}

impl fmt::Display for IMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "------ IMark({:#x}, {}, {}) ------",
            self.addr(),
            self.len(),
            self.delta()
        )
    }
}

impl fmt::Display for AbiHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "====== AbiHint({}, {}, {}) ======",
            self.base(),
            self.len(),
            self.nia()
        )
    }
}

impl fmt::Display for Put {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PUT({}) = {}", self.offset(), self.data())
    }
}

impl fmt::Display for PutI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PUTI{}[{},{}] = {}",
            self.descr(),
            self.ix(),
            self.bias(),
            self.data()
        )
    }
}

impl fmt::Display for WrTmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.tmp(), self.data())
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ST{}({}) = {}",
            self.endness().suffix(),
            self.addr(),
            self.data()
        )
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.endness().suffix();
        match (self.old_hi(), self.expd_hi(), self.data_hi()) {
            (Some(old_hi), Some(expd_hi), Some(data_hi)) => write!(
                f,
                "{},{} = CAS{}({} :: ({},{})->({},{}))",
                old_hi,
                self.old_lo(),
                end,
                self.addr(),
                expd_hi,
                self.expd_lo(),
                data_hi,
                self.data_lo()
            ),
            _ => write!(
                f,
                "{} = CAS{}({} :: {}->{})",
                self.old_lo(),
                end,
                self.addr(),
                self.expd_lo(),
                self.data_lo()
            ),
        }
    }
}

impl fmt::Display for Llsc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.endness().suffix();
        match self.op() {
            LlscOp::LoadLinked => write!(f, "{} = LD{}-Linked({})", self.result(), end, self.addr()),
            LlscOp::StoreConditional(data) => write!(
                f,
                "{} = ( ST{}-Cond({}) = {} )",
                self.result(),
                end,
                self.addr(),
                data
            ),
        }
    }
}

impl fmt::Display for Dirty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tmp) = self.tmp() {
            write!(f, "{} = ", tmp)?;
        }
        write!(f, "DIRTY {}", self.guard())?;
        if let Some(addr) = self.m_addr() {
            write!(f, " {}-mem({},{})", effect_abbrev(self.m_fx()), addr, self.m_size())?;
        }
        for fx in self.fx_state() {
            write!(f, " {}-gst({},{}", effect_abbrev(fx.fx), fx.offset, fx.size)?;
            if fx.n_repeats > 0 {
                write!(f, ",reps{},step{}", fx.n_repeats, fx.repeat_len)?;
            }
            f.write_str(")")?;
        }
        write!(f, " ::: {}(", self.cee())?;
        write_list(f, &self.args())?;
        f.write_str(")")
    }
}

impl fmt::Display for Mbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.event().name();
        write!(f, "IR-MBE-{}", name.trim_start_matches("Imbe_"))
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "if ({}) {{ PUT({}) = {}; exit-{} }}",
            self.guard(),
            self.offs_ip(),
            self.dst(),
            self.jumpkind().name().trim_start_matches("Ijk_")
        )
    }
}

impl fmt::Display for UnknownStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IR-Unknown({:#x})", self.raw_tag())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::NoOp(s) => fmt::Display::fmt(s, f),
            Stmt::IMark(s) => fmt::Display::fmt(s, f),
            Stmt::AbiHint(s) => fmt::Display::fmt(s, f),
            Stmt::Put(s) => fmt::Display::fmt(s, f),
            Stmt::PutI(s) => fmt::Display::fmt(s, f),
            Stmt::WrTmp(s) => fmt::Display::fmt(s, f),
            Stmt::Store(s) => fmt::Display::fmt(s, f),
            Stmt::Cas(s) => fmt::Display::fmt(s, f),
            Stmt::Llsc(s) => fmt::Display::fmt(s, f),
            Stmt::Dirty(s) => fmt::Display::fmt(s, f),
            Stmt::Mbe(s) => fmt::Display::fmt(s, f),
            Stmt::Exit(s) => fmt::Display::fmt(s, f),
            Stmt::Unknown(s) => fmt::Display::fmt(s, f),
        }
    }
}
