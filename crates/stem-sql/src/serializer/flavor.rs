use super::Serializer;

use stem_core::driver::Dialect;

#[derive(Debug, Clone, Copy)]
pub(super) enum Flavor {
    Mysql,
    Sqlite,
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer {
            flavor: Flavor::Sqlite,
        }
    }

    pub fn mysql() -> Serializer {
        Serializer {
            flavor: Flavor::Mysql,
        }
    }

    pub fn for_dialect(dialect: Dialect) -> Serializer {
        match dialect {
            Dialect::Mysql => Serializer::mysql(),
            Dialect::Sqlite => Serializer::sqlite(),
        }
    }
}
