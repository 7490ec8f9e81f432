///
/// Scalar Registry
///
/// Single source of truth for scalar kind metadata shared across the core.
/// Numeric sizes are in bytes and drive the widening rules of the converter;
/// decimal is numeric but neither integral nor floating.
///

macro_rules! scalar_registry {
    ( $( ($kind:ident, $label:literal, value_type = $value_type:literal, numeric = $numeric:expr) ),* $(,)? ) => {
        ///
        /// ScalarKind
        ///

        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum ScalarKind {
            $( $kind, )*
        }

        impl ScalarKind {
            pub const ALL: &'static [Self] = &[ $( Self::$kind, )* ];

            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $( Self::$kind => $label, )*
                }
            }

            /// Value types cannot hold null unless wrapped in `Nullable`.
            #[must_use]
            pub const fn is_value_type(self) -> bool {
                match self {
                    $( Self::$kind => $value_type, )*
                }
            }

            #[must_use]
            pub const fn numeric(self) -> Option<NumericFacts> {
                match self {
                    $( Self::$kind => $numeric, )*
                }
            }
        }
    };
}

///
/// NumericClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NumericClass {
    Signed,
    Unsigned,
    Floating,
    Decimal,
}

///
/// NumericFacts
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NumericFacts {
    pub size: u8,
    pub class: NumericClass,
}

impl NumericFacts {
    const fn new(size: u8, class: NumericClass) -> Option<Self> {
        Some(Self { size, class })
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self.class, NumericClass::Signed | NumericClass::Unsigned)
    }

    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(self.class, NumericClass::Floating)
    }

    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self.class, NumericClass::Unsigned)
    }
}

scalar_registry! {
    (Bool,           "bool",           value_type = true,  numeric = None),
    (I8,             "i8",             value_type = true,  numeric = NumericFacts::new(1, NumericClass::Signed)),
    (U8,             "u8",             value_type = true,  numeric = NumericFacts::new(1, NumericClass::Unsigned)),
    (I16,            "i16",            value_type = true,  numeric = NumericFacts::new(2, NumericClass::Signed)),
    (U16,            "u16",            value_type = true,  numeric = NumericFacts::new(2, NumericClass::Unsigned)),
    (I32,            "i32",            value_type = true,  numeric = NumericFacts::new(4, NumericClass::Signed)),
    (U32,            "u32",            value_type = true,  numeric = NumericFacts::new(4, NumericClass::Unsigned)),
    (I64,            "i64",            value_type = true,  numeric = NumericFacts::new(8, NumericClass::Signed)),
    (U64,            "u64",            value_type = true,  numeric = NumericFacts::new(8, NumericClass::Unsigned)),
    (F32,            "f32",            value_type = true,  numeric = NumericFacts::new(4, NumericClass::Floating)),
    (F64,            "f64",            value_type = true,  numeric = NumericFacts::new(8, NumericClass::Floating)),
    (Decimal,        "decimal",        value_type = true,  numeric = NumericFacts::new(16, NumericClass::Decimal)),
    (Text,           "string",         value_type = false, numeric = None),
    (Blob,           "bytes",          value_type = false, numeric = None),
    (DateTime,       "datetime",       value_type = true,  numeric = None),
    (Date,           "date",           value_type = true,  numeric = None),
    (TimeSpan,       "timespan",       value_type = true,  numeric = None),
    (TimeOfDay,      "time",           value_type = true,  numeric = None),
    (DateTimeOffset, "datetimeoffset", value_type = true,  numeric = None),
}

impl ScalarKind {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.numeric().is_some()
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        match self.numeric() {
            Some(facts) => facts.is_integral(),
            None => false,
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
