//! Spotlights attached to actors.
//!
//! Each actor carries a `Transform`, and some also carry a `Spotlight`. Lights are switched off
//! with a soft delete during the frame and compacted at the start of the next one; destroying an
//! actor removes all of its rows through deletion callbacks. The light cone is tuned through the
//! dynamic attribute interface, the way an editor would.

use rusty_ecs::ecs::{
    Component, FourCC, Value, World, WorldId,
    component::Config,
    storage::IndexKind,
};

#[derive(Component, Clone, Default, Debug)]
struct Transform {
    #[attribute(fourcc = "POS ")]
    position: [f32; 4],
}

#[derive(Component, Clone, Debug)]
#[component(name = "Spotlight")]
struct Spotlight {
    #[attribute(fourcc = "INNR")]
    inner_angle: f32,
    #[attribute(fourcc = "OUTR")]
    outer_angle: f32,
    #[attribute(fourcc = "RANG")]
    range: f32,
    cast_shadows: bool,
}

impl Default for Spotlight {
    fn default() -> Self {
        Self {
            inner_angle: 20.0,
            outer_angle: 35.0,
            range: 10.0,
            cast_shadows: true,
        }
    }
}

fn print_lights(world: &World) {
    let Some(lights) = world.component::<Spotlight>() else {
        return;
    };
    println!(
        "{} rows, {} lit, {} pending removal, index ~{} bytes",
        lights.len(),
        lights.active_len(),
        lights.pending_len(),
        lights.index_memory_usage()
    );
    for (instance, owner, light) in lights.iter() {
        println!("  {instance} {owner}: {light:?}");
    }
}

fn main() -> rusty_ecs::ecs::Result<()> {
    let mut world = World::new(WorldId::new(1));
    world.register_component::<Transform>()?;
    // Few actors carry lights, so a hash index keeps the lookup table small.
    world.register_component_with::<Spotlight>(Config::default().with_index(IndexKind::Hash))?;

    let actors = world.alloc_many(6);
    for (i, &actor) in actors.iter().enumerate() {
        world.register_entity::<Transform>(actor)?;
        if let Some(transform) = world.get_mut::<Transform>(actor) {
            transform.position = [i as f32 * 2.0, 3.0, 0.0, 1.0];
        }
        if i % 2 == 0 {
            world.register_entity::<Spotlight>(actor)?;
        }
    }
    print_lights(&world);

    // Widen one cone through the attribute interface.
    world.set_attribute_value("Spotlight", actors[2], FourCC::new(*b"OUTR"), Value::Float(50.0))?;
    let range = world.attribute_value("Spotlight", actors[2], FourCC::new(*b"RANG"))?;
    println!("range of {}: {range:?}", actors[2]);

    // Switch a light off mid-frame. The row stays until the frame ends.
    world.deregister_entity::<Spotlight>(actors[0]);
    print_lights(&world);

    // Destroy an actor. Both of its rows go immediately.
    world.destroy(actors[4]);
    print_lights(&world);

    let removed = world.on_begin_frame();
    println!("begin frame removed {removed} rows");
    print_lights(&world);

    if let Some(definition) = world.attributes().get_by_name("Range") {
        println!(
            "registered attribute {} ({}, {})",
            definition.name(),
            definition.fourcc(),
            definition.kind()
        );
    }

    Ok(())
}
