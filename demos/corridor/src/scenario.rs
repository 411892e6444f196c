//! The corridor scenario document.

/// Three 300 m links in a row, one entry, one exit, a sensor on the middle
/// link and one spanning the whole corridor.  Two simulated minutes.
pub const CORRIDOR_XML: &str = r#"<ROOT>
  <SIMULATIONS>
    <SIMULATION id="corridor" pasdetemps="1" debut="08:00:00" fin="08:02:00" seed="42"/>
  </SIMULATIONS>
  <TRAFICS>
    <TRAFIC id="corridor_traffic">
      <TRONCONS>
        <TRONCON id="Corridor_1"/>
        <TRONCON id="Corridor_2"/>
        <TRONCON id="Corridor_3"/>
      </TRONCONS>
      <TYPES_DE_VEHICULE>
        <TYPE_DE_VEHICULE id="VL" w="-5" kx="0.12" vx="14"/>
        <TYPE_DE_VEHICULE id="PL" w="-5" kx="0.08" vx="10"/>
      </TYPES_DE_VEHICULE>
      <EXTREMITES>
        <EXTREMITE id="E_West"/>
        <EXTREMITE id="S_East"/>
      </EXTREMITES>
      <PARAMETRAGE_CAPTEURS>
        <CAPTEURS>
          <CAPTEUR_MFD id="Sensor_Mid">
            <TRONCONS>
              <TRONCON id="Corridor_2"/>
            </TRONCONS>
          </CAPTEUR_MFD>
          <CAPTEUR_MFD id="Sensor_All">
            <TRONCONS>
              <TRONCON id="Corridor_1"/>
              <TRONCON id="Corridor_2"/>
              <TRONCON id="Corridor_3"/>
            </TRONCONS>
          </CAPTEUR_MFD>
        </CAPTEURS>
      </PARAMETRAGE_CAPTEURS>
    </TRAFIC>
  </TRAFICS>
</ROOT>"#;
