//! Natively implemented operations. User programs may call them but never
//! declare or assign names that collide with them.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    Or,
    And,
    Not,
    Scan,
    Print,
    ArrayCreate,
    ArrayGet,
    ArraySet,
    ArrayScan,
    ArrayPrint,
}

impl Builtin {
    pub const ALL: [Builtin; 21] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Rem,
        Builtin::Lt,
        Builtin::Gt,
        Builtin::LtEq,
        Builtin::GtEq,
        Builtin::Eq,
        Builtin::NotEq,
        Builtin::Or,
        Builtin::And,
        Builtin::Not,
        Builtin::Scan,
        Builtin::Print,
        Builtin::ArrayCreate,
        Builtin::ArrayGet,
        Builtin::ArraySet,
        Builtin::ArrayScan,
        Builtin::ArrayPrint,
    ];

    /// The array operations counted by the frequency signal, in vector order.
    pub const ARRAY_OPERATIONS: [Builtin; 5] = [
        Builtin::ArrayCreate,
        Builtin::ArrayGet,
        Builtin::ArraySet,
        Builtin::ArrayScan,
        Builtin::ArrayPrint,
    ];

    pub fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "+" => Builtin::Add,
            "-" => Builtin::Sub,
            "*" => Builtin::Mul,
            "/" => Builtin::Div,
            "%" => Builtin::Rem,
            "<" => Builtin::Lt,
            ">" => Builtin::Gt,
            "<=" => Builtin::LtEq,
            ">=" => Builtin::GtEq,
            "==" => Builtin::Eq,
            "!=" => Builtin::NotEq,
            "||" => Builtin::Or,
            "&&" => Builtin::And,
            "!" => Builtin::Not,
            "scan" => Builtin::Scan,
            "print" => Builtin::Print,
            "array.create" => Builtin::ArrayCreate,
            "array.get" => Builtin::ArrayGet,
            "array.set" => Builtin::ArraySet,
            "array.scan" => Builtin::ArrayScan,
            "array.print" => Builtin::ArrayPrint,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Rem => "%",
            Builtin::Lt => "<",
            Builtin::Gt => ">",
            Builtin::LtEq => "<=",
            Builtin::GtEq => ">=",
            Builtin::Eq => "==",
            Builtin::NotEq => "!=",
            Builtin::Or => "||",
            Builtin::And => "&&",
            Builtin::Not => "!",
            Builtin::Scan => "scan",
            Builtin::Print => "print",
            Builtin::ArrayCreate => "array.create",
            Builtin::ArrayGet => "array.get",
            Builtin::ArraySet => "array.set",
            Builtin::ArrayScan => "array.scan",
            Builtin::ArrayPrint => "array.print",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Scan => 0,
            Builtin::Not
            | Builtin::Print
            | Builtin::ArrayCreate
            | Builtin::ArrayScan
            | Builtin::ArrayPrint => 1,
            Builtin::ArraySet => 3,
            _ => 2,
        }
    }

    /// Operators over integers with no side effects; the normalizer folds these.
    pub fn is_operator(self) -> bool {
        !matches!(
            self,
            Builtin::Scan
                | Builtin::Print
                | Builtin::ArrayCreate
                | Builtin::ArrayGet
                | Builtin::ArraySet
                | Builtin::ArrayScan
                | Builtin::ArrayPrint
        )
    }

    /// Applies an integer operator. `None` when the operation is undefined
    /// (zero divisor) or the builtin is not an operator.
    pub fn apply_operator(self, args: &[i32]) -> Option<i32> {
        let bool_int = |b: bool| i32::from(b);
        let value = match (self, args) {
            (Builtin::Not, [x]) => bool_int(*x == 0),
            (Builtin::Add, [x, y]) => x.wrapping_add(*y),
            (Builtin::Sub, [x, y]) => x.wrapping_sub(*y),
            (Builtin::Mul, [x, y]) => x.wrapping_mul(*y),
            (Builtin::Div, [_, 0]) | (Builtin::Rem, [_, 0]) => return None,
            (Builtin::Div, [x, y]) => x.wrapping_div(*y),
            (Builtin::Rem, [x, y]) => x.wrapping_rem(*y),
            (Builtin::Lt, [x, y]) => bool_int(x < y),
            (Builtin::Gt, [x, y]) => bool_int(x > y),
            (Builtin::LtEq, [x, y]) => bool_int(x <= y),
            (Builtin::GtEq, [x, y]) => bool_int(x >= y),
            (Builtin::Eq, [x, y]) => bool_int(x == y),
            (Builtin::NotEq, [x, y]) => bool_int(x != y),
            (Builtin::Or, [x, y]) => bool_int(*x != 0 || *y != 0),
            (Builtin::And, [x, y]) => bool_int(*x != 0 && *y != 0),
            _ => return None,
        };
        Some(value)
    }
}

pub fn is_builtin(name: &str) -> bool {
    Builtin::from_name(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("main"), None);
    }

    #[test]
    fn operators_wrap_and_refuse_zero_divisors() {
        assert_eq!(Builtin::Add.apply_operator(&[i32::MAX, 1]), Some(i32::MIN));
        assert_eq!(Builtin::Div.apply_operator(&[i32::MIN, -1]), Some(i32::MIN));
        assert_eq!(Builtin::Div.apply_operator(&[7, 0]), None);
        assert_eq!(Builtin::Rem.apply_operator(&[-7, 2]), Some(-1));
        assert_eq!(Builtin::Not.apply_operator(&[0]), Some(1));
        assert_eq!(Builtin::And.apply_operator(&[3, 0]), Some(0));
        assert_eq!(Builtin::Print.apply_operator(&[1]), None);
    }
}
