//! Pet store schema managed by this service.

use cqlbind::columns::{self, CqlType};
use cqlbind::{register_model, ModelDef};

pub static ADDRESS: ModelDef = ModelDef::user_type("Address").columns(&[
    columns::text("street"),
    columns::text("city"),
    columns::text("zipcode"),
]);

pub static OWNER: ModelDef = ModelDef::table("Owner").columns(&[
    columns::uuid("owner_id").partition_key(),
    columns::text("name"),
    columns::text("email").indexed(),
    columns::user_type("address", "address"),
    columns::set("phone_numbers", &CqlType::Text),
]);

pub static PET: ModelDef = ModelDef::table("Pet").abstract_model().columns(&[
    columns::uuid("owner_id").partition_key(),
    columns::timeuuid("pet_id").clustering_key().descending(),
    columns::text("name"),
    columns::timestamp("adopted_at"),
]);

pub static CAT: ModelDef = ModelDef::table("Cat")
    .extends("Pet")
    .columns(&[columns::float("cuteness")]);

pub static DOG: ModelDef = ModelDef::table("Dog")
    .extends("Pet")
    .columns(&[columns::float("fierceness"), columns::text("breed").indexed()]);

register_model!(ADDRESS);
register_model!(OWNER);
register_model!(PET);
register_model!(CAT);
register_model!(DOG);
