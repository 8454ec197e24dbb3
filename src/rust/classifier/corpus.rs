//! Bundled Spanish product-review examples used when no model artifact exists.

use super::builder::{ClassDefinition, ClassifierBuilder};
use super::error::ClassifierError;

pub const POSITIVE_LABEL: &str = "positivo";
pub const NEGATIVE_LABEL: &str = "negativo";

const POSITIVE_EXAMPLES: &[&str] = &[
    "Este producto es excelente, muy recomendado",
    "Producto increíble, superó mis expectativas",
    "Buena relación calidad-precio",
    "Fantástico servicio y producto",
    "Me encanta, funciona de maravilla",
    "Excelente calidad, llegó rápido",
    "Muy buena compra, lo volvería a comprar",
    "Estoy feliz con el resultado, lo recomiendo",
];

const NEGATIVE_EXAMPLES: &[&str] = &[
    "No me gustó para nada, muy malo",
    "Terrible calidad, no lo compren",
    "Decepcionante, esperaba más",
    "Pésima experiencia de compra",
    "Se rompió a los dos días, una estafa",
    "Mala calidad y peor atención",
    "Llegó tarde y dañado, horrible",
    "No funciona, quiero mi dinero de vuelta",
];

/// Class definitions of the bundled sentiment corpus.
pub fn bundled_classes() -> Vec<ClassDefinition> {
    vec![
        ClassDefinition::new(NEGATIVE_LABEL, "Opiniones desfavorables sobre un producto o servicio")
            .with_examples(NEGATIVE_EXAMPLES.to_vec()),
        ClassDefinition::new(POSITIVE_LABEL, "Opiniones favorables sobre un producto o servicio")
            .with_examples(POSITIVE_EXAMPLES.to_vec()),
    ]
}

/// A builder preloaded with the bundled corpus.
pub fn bundled_builder() -> Result<ClassifierBuilder, ClassifierError> {
    bundled_classes()
        .into_iter()
        .try_fold(ClassifierBuilder::new(), |builder, class| builder.add_class(class))
}
